//! Outbound event publishing
//!
//! All outgoing MQTT traffic (capture events on topic A, context codes on
//! topic B) goes through one shared [`EventPublisher`]. The trait seam keeps
//! the fire-and-forget policy testable: fakes record call arguments instead
//! of touching the network.

use anyhow::{Context, Result};
use bytes::Bytes;
use rumqttc::{AsyncClient, QoS};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Event announcing one completed capture, published to the image topic.
///
/// All four fields are mandatory. `timestamp` is the local receipt time of
/// the triggering sensor reading, `Ta` the sensor-reported time, `Tphoto`
/// the local time at which the photo step executed (all ms since epoch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePublishedEvent {
    /// Filename of the capture, also its identifier at the upload endpoint
    pub file: String,
    pub timestamp: i64,
    #[serde(rename = "Ta")]
    pub ta: i64,
    #[serde(rename = "Tphoto")]
    pub tphoto: i64,
}

/// Fire-and-forget publish capability.
///
/// A failed publish is the caller's problem to log and swallow; there is no
/// buffering or retry anywhere behind this trait.
#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a payload to a topic.
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()>;

    /// Whether the underlying connection is currently established.
    ///
    /// Callers skip publishing (silently) while this is false.
    fn is_connected(&self) -> bool;
}

/// Shared connection-state flag, written by the MQTT event loop.
///
/// Set on ConnAck, cleared when the event loop errors out. Once the loop
/// gives up, publishing stays disabled for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct ConnectionState(Arc<AtomicBool>);

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_connected(&self, connected: bool) {
        self.0.store(connected, Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// MQTT-backed publisher over the process's single shared client.
pub struct MqttPublisher {
    client: AsyncClient,
    state: ConnectionState,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient, state: ConnectionState) -> Self {
        Self { client, state }
    }
}

#[async_trait::async_trait]
impl EventPublisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        self.client
            .publish_bytes(topic, QoS::AtMostOnce, false, payload)
            .await
            .with_context(|| format!("Failed to publish to {}", topic))
    }

    fn is_connected(&self) -> bool {
        self.state.is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_event_serializes_with_wire_field_names() {
        let event = ImagePublishedEvent {
            file: "20250101_120000123.jpg".to_string(),
            timestamp: 1735732800123,
            ta: 1735732800100,
            tphoto: 1735732800456,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"file":"20250101_120000123.jpg","timestamp":1735732800123,"Ta":1735732800100,"Tphoto":1735732800456}"#
        );

        let back: ImagePublishedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn connection_state_toggles() {
        let state = ConnectionState::new();
        assert!(!state.is_connected());
        state.set_connected(true);
        assert!(state.is_connected());

        let shared = state.clone();
        shared.set_connected(false);
        assert!(!state.is_connected());
    }
}
