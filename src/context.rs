//! Environmental context descriptor
//!
//! Three binary-valued selections (lighting, weather, traffic density) are
//! encoded as a fixed 3-character code and published whenever any of them
//! changes. The topic is a leveled, last-value-wins signal: republishing the
//! same code is harmless and consumers must treat it as such.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::publish::EventPublisher;

/// Lighting condition, slot 1 of the context code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lighting {
    #[default]
    Day,
    Night,
}

impl Lighting {
    pub fn code(self) -> char {
        match self {
            Lighting::Day => 'd',
            Lighting::Night => 'n',
        }
    }

    /// Map a UI option string; absent or unrecognized selects the default.
    pub fn from_option(text: Option<&str>) -> Self {
        match text {
            Some("Night") => Lighting::Night,
            _ => Lighting::Day,
        }
    }
}

/// Weather condition, slot 2 of the context code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Weather {
    #[default]
    Dry,
    Rain,
}

impl Weather {
    pub fn code(self) -> char {
        match self {
            Weather::Dry => 'd',
            Weather::Rain => 'r',
        }
    }

    pub fn from_option(text: Option<&str>) -> Self {
        match text {
            Some("Rainy") => Weather::Rain,
            _ => Weather::Dry,
        }
    }
}

/// Traffic density, slot 3 of the context code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Traffic {
    #[default]
    OffPeak,
    Rush,
}

impl Traffic {
    pub fn code(self) -> char {
        match self {
            Traffic::OffPeak => 'o',
            Traffic::Rush => 'r',
        }
    }

    pub fn from_option(text: Option<&str>) -> Self {
        match text {
            Some("Rush hours") => Traffic::Rush,
            _ => Traffic::OffPeak,
        }
    }
}

/// Current selection across the three context dimensions.
///
/// Defaults (`"ddo"`) apply whenever a selector is absent or empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextSelection {
    pub lighting: Lighting,
    pub weather: Weather,
    pub traffic: Traffic,
}

impl ContextSelection {
    /// Build a selection from raw option strings, empty mapping to defaults.
    pub fn from_options(
        lighting: Option<&str>,
        weather: Option<&str>,
        traffic: Option<&str>,
    ) -> Self {
        Self {
            lighting: Lighting::from_option(lighting.filter(|s| !s.is_empty())),
            weather: Weather::from_option(weather.filter(|s| !s.is_empty())),
            traffic: Traffic::from_option(traffic.filter(|s| !s.is_empty())),
        }
    }

    /// Encode as the fixed 3-character code, slot order lighting/weather/traffic.
    pub fn encode(&self) -> String {
        [
            self.lighting.code(),
            self.weather.code(),
            self.traffic.code(),
        ]
        .iter()
        .collect()
    }
}

/// Wire payload for the context topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEvent {
    pub b: String,
}

/// Publishes the current context selection to its topic on every change.
pub struct ContextPublisher {
    selection: ContextSelection,
    topic: String,
    publisher: Arc<dyn EventPublisher>,
}

impl ContextPublisher {
    pub fn new(
        selection: ContextSelection,
        topic: impl Into<String>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            selection,
            topic: topic.into(),
            publisher,
        }
    }

    pub fn selection(&self) -> ContextSelection {
        self.selection
    }

    pub async fn set_lighting(&mut self, lighting: Lighting) {
        if self.selection.lighting != lighting {
            self.selection.lighting = lighting;
            self.publish_current_selection().await;
        }
    }

    pub async fn set_weather(&mut self, weather: Weather) {
        if self.selection.weather != weather {
            self.selection.weather = weather;
            self.publish_current_selection().await;
        }
    }

    pub async fn set_traffic(&mut self, traffic: Traffic) {
        if self.selection.traffic != traffic {
            self.selection.traffic = traffic;
            self.publish_current_selection().await;
        }
    }

    /// Publish the current selection.
    ///
    /// Called once after startup to announce initial state and on every
    /// change thereafter. Skips silently when the publish connection is down
    /// or the topic is unconfigured; there is no buffering or retry.
    pub async fn publish_current_selection(&self) {
        if self.topic.is_empty() {
            debug!("Context topic unconfigured, skipping publish");
            return;
        }
        if !self.publisher.is_connected() {
            debug!("Publish connection down, skipping context publish");
            return;
        }

        let event = ContextEvent {
            b: self.selection.encode(),
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to encode context payload: {}", e);
                return;
            }
        };

        if let Err(e) = self.publisher.publish(&self.topic, payload.into()).await {
            warn!(topic = %self.topic, "Context publish failed: {}", e);
        } else {
            debug!(topic = %self.topic, code = %event.b, "Published context selection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::EventPublisher;
    use anyhow::Result;
    use bytes::Bytes;
    use std::sync::Mutex;

    struct RecordingPublisher {
        connected: bool,
        sent: Mutex<Vec<(String, Bytes)>>,
    }

    impl RecordingPublisher {
        fn new(connected: bool) -> Arc<Self> {
            Arc::new(Self {
                connected,
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
            self.sent.lock().unwrap().push((topic.to_string(), payload));
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    #[test]
    fn encoding_covers_all_eight_combinations() {
        let cases = [
            (Lighting::Day, Weather::Dry, Traffic::OffPeak, "ddo"),
            (Lighting::Day, Weather::Dry, Traffic::Rush, "ddr"),
            (Lighting::Day, Weather::Rain, Traffic::OffPeak, "dro"),
            (Lighting::Day, Weather::Rain, Traffic::Rush, "drr"),
            (Lighting::Night, Weather::Dry, Traffic::OffPeak, "ndo"),
            (Lighting::Night, Weather::Dry, Traffic::Rush, "ndr"),
            (Lighting::Night, Weather::Rain, Traffic::OffPeak, "nro"),
            (Lighting::Night, Weather::Rain, Traffic::Rush, "nrr"),
        ];
        for (lighting, weather, traffic, expected) in cases {
            let sel = ContextSelection {
                lighting,
                weather,
                traffic,
            };
            assert_eq!(sel.encode(), expected);
        }
    }

    #[test]
    fn absent_selectors_yield_defaults() {
        let sel = ContextSelection::from_options(None, None, None);
        assert_eq!(sel.encode(), "ddo");

        // Empty strings behave like absent selectors
        let sel = ContextSelection::from_options(Some(""), Some(""), Some(""));
        assert_eq!(sel.encode(), "ddo");

        // Unrecognized option strings fall back to defaults too
        let sel = ContextSelection::from_options(Some("Dusk"), Some("Snow"), Some("Gridlock"));
        assert_eq!(sel.encode(), "ddo");
    }

    #[test]
    fn option_strings_map_to_codes() {
        let sel = ContextSelection::from_options(Some("Night"), Some("Rainy"), Some("Rush hours"));
        assert_eq!(sel.encode(), "nrr");

        let sel = ContextSelection::from_options(Some("Day"), Some("Dry"), Some("Off-peak hours"));
        assert_eq!(sel.encode(), "ddo");
    }

    #[tokio::test]
    async fn republishing_unchanged_selection_is_idempotent() {
        let publisher = RecordingPublisher::new(true);
        let ctx = ContextPublisher::new(
            ContextSelection::default(),
            "cam/conditions",
            publisher.clone(),
        );

        ctx.publish_current_selection().await;
        ctx.publish_current_selection().await;

        let sent = publisher.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], sent[1]);
        assert_eq!(sent[0].0, "cam/conditions");
        assert_eq!(&sent[0].1[..], br#"{"b":"ddo"}"#);
    }

    #[tokio::test]
    async fn setters_publish_only_on_change() {
        let publisher = RecordingPublisher::new(true);
        let mut ctx = ContextPublisher::new(
            ContextSelection::default(),
            "cam/conditions",
            publisher.clone(),
        );

        ctx.set_lighting(Lighting::Night).await;
        ctx.set_lighting(Lighting::Night).await; // no change, no publish
        ctx.set_traffic(Traffic::Rush).await;

        let sent = publisher.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(&sent[0].1[..], br#"{"b":"ndo"}"#);
        assert_eq!(&sent[1].1[..], br#"{"b":"ndr"}"#);
    }

    #[tokio::test]
    async fn skips_publish_when_disconnected_or_unconfigured() {
        let publisher = RecordingPublisher::new(false);
        let ctx = ContextPublisher::new(
            ContextSelection::default(),
            "cam/conditions",
            publisher.clone(),
        );
        ctx.publish_current_selection().await;
        assert!(publisher.sent.lock().unwrap().is_empty());

        let publisher = RecordingPublisher::new(true);
        let ctx = ContextPublisher::new(ContextSelection::default(), "", publisher.clone());
        ctx.publish_current_selection().await;
        assert!(publisher.sent.lock().unwrap().is_empty());
    }
}
