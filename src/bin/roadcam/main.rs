//! Roadcam agent binary
//!
//! Wires the sensor listener, trigger dispatcher, capture pipeline, and
//! context publisher together over one shared MQTT connection.
//!
//! ## Usage
//!
//! ```bash
//! # Point at the broker and upload endpoint
//! export ROADCAM_BROKER_HOST=192.168.137.1
//! export ROADCAM_UPLOAD_URL=http://192.168.137.1:5000/upload
//!
//! # Optional: capture every 10th reading, camera mounted sideways
//! export ROADCAM_TRIGGER_THRESHOLD=10
//! export ROADCAM_ROTATION=cw
//!
//! roadcam
//! ```
//!
//! The binary ships with the synthetic test-pattern source; real capture
//! devices plug in behind the `FrameSource` trait.

use anyhow::Result;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use roadcam::dispatch::trigger_channel;
use roadcam::pipeline::PipelineConfig;
use roadcam::publish::ConnectionState;
use roadcam::{
    CapturePipeline, Config, ContextPublisher, ContextSelection, EventPublisher, HttpUploader,
    ImageStore, LogIndicator, MqttPublisher, SensorFeedListener, TestPatternSource,
    TriggerDispatcher,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("roadcam=info".parse().unwrap()),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!("Roadcam starting");
    info!("  Broker: {}:{}", config.broker_host, config.broker_port);
    info!(
        "  Topics: sensor={} image={} context={}",
        config.sensor_topic, config.image_topic, config.context_topic
    );
    info!("  Upload: {}", config.upload_url);
    info!(
        "  Trigger threshold: {}, rotation: {}",
        config.trigger_threshold, config.rotation
    );

    // Trigger channel between the sensor listener and the dispatcher
    let (trigger_tx, trigger_rx) = trigger_channel();
    let listener = SensorFeedListener::new(config.trigger_threshold, trigger_tx);

    // One shared MQTT connection for subscribe and both publish topics
    let mut options = MqttOptions::new(
        format!("roadcam-{}", std::process::id()),
        &config.broker_host,
        config.broker_port,
    );
    options.set_keep_alive(Duration::from_secs(30));
    let (client, eventloop) = AsyncClient::new(options, 16);

    let state = ConnectionState::new();
    let publisher: Arc<dyn EventPublisher> =
        Arc::new(MqttPublisher::new(client.clone(), state.clone()));

    let selection = ContextSelection::from_options(
        config.lighting.as_deref(),
        config.weather.as_deref(),
        config.traffic.as_deref(),
    );
    info!("  Initial context: {}", selection.encode());
    let context = ContextPublisher::new(selection, config.context_topic.clone(), publisher.clone());

    // MQTT event loop task: owns the listener, announces initial context
    let sensor_topic = config.sensor_topic.clone();
    tokio::spawn(async move {
        mqtt_loop(eventloop, client, state, listener, context, sensor_topic).await;
    });

    // Capture pipeline
    let store = ImageStore::new(&config.storage_dir)?;
    let uploader = Arc::new(HttpUploader::new(
        config.upload_url.clone(),
        config.upload_timeout,
    )?);
    let source = Arc::new(TestPatternSource::new(
        config.frame_width,
        config.frame_height,
    ));
    let pipeline = Arc::new(CapturePipeline::new(
        PipelineConfig {
            rotation: config.rotation,
            image_topic: config.image_topic.clone(),
            jpeg_quality: config.jpeg_quality,
        },
        source,
        store,
        uploader,
        publisher,
        Arc::new(LogIndicator),
    ));

    // Dispatcher runs on the main task until the trigger sender is dropped
    // (which happens when the MQTT event loop ends).
    TriggerDispatcher::new(trigger_rx, pipeline).run().await;

    info!("Roadcam shutting down");
    Ok(())
}

/// Drive the MQTT event loop: track connection state, subscribe to the
/// sensor topic, feed inbound messages to the listener, and announce the
/// initial context selection once connected.
///
/// The connection is established once at startup. If it fails before the
/// first ConnAck, or drops later, publish/subscribe stays disabled for the
/// rest of the process lifetime; capture and upload are unaffected.
async fn mqtt_loop(
    mut eventloop: rumqttc::EventLoop,
    client: AsyncClient,
    state: ConnectionState,
    mut listener: SensorFeedListener,
    context: ContextPublisher,
    sensor_topic: String,
) {
    let mut connected_once = false;

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                state.set_connected(true);
                if !connected_once {
                    connected_once = true;
                    info!("MQTT connected, subscribing to {}", sensor_topic);
                    if let Err(e) = client.subscribe(&sensor_topic, QoS::AtLeastOnce).await {
                        warn!("Sensor topic subscribe failed: {}", e);
                    }
                    // Announce initial context state
                    context.publish_current_selection().await;
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if publish.topic == sensor_topic {
                    listener.handle_message(&publish.payload);
                }
            }
            Ok(_) => {}
            Err(e) => {
                state.set_connected(false);
                if connected_once {
                    warn!("MQTT connection lost: {}; publishing disabled", e);
                } else {
                    error!(
                        "MQTT connection failed: {}; publish/subscribe disabled for this process",
                        e
                    );
                }
                break;
            }
        }
    }
}
