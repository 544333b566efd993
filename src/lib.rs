//! Roadcam - MQTT-correlated roadside image capture agent
//!
//! Roadcam listens to a periodic sensor feed (timestamped status messages
//! from a roadside microcontroller), captures an image every Nth reading,
//! annotates the capture with timing metadata, uploads the JPEG to a
//! collection endpoint, and announces it on an MQTT topic. A small
//! environmental-context descriptor (lighting/weather/traffic) is
//! republished whenever it changes.
//!
//! # Architecture
//!
//! Four cooperating parts:
//!
//! 1. **Sensor listener** - parses inbound sensor messages, keeps the latest
//!    timing snapshot, and raises a capture trigger every Nth reading
//! 2. **Trigger dispatcher** - drains a single-slot trigger channel and runs
//!    exactly one capture pipeline at a time
//! 3. **Capture pipeline** - frame acquisition, JPEG encode, local persist,
//!    upload, event publish
//! 4. **Context publisher** - encodes the 3-character context code and
//!    republishes it on change
//!
//! # Example
//!
//! ```ignore
//! use roadcam::{SensorFeedListener, TriggerDispatcher};
//! use roadcam::dispatch::trigger_channel;
//!
//! let (trigger_tx, trigger_rx) = trigger_channel();
//! let mut listener = SensorFeedListener::new(5, trigger_tx);
//!
//! // MQTT event loop task:
//! listener.handle_message(payload);
//!
//! // Dispatcher task:
//! TriggerDispatcher::new(trigger_rx, pipeline).run().await;
//! ```

// Frame acquisition and rotation
pub mod capture;

// Environment-driven configuration
pub mod config;

// Environmental context descriptor
pub mod context;

// Trigger channel and dispatch loop
pub mod dispatch;

// Capture pipeline orchestration
pub mod pipeline;

// Outbound event publishing
pub mod publish;

// Sensor feed decoding and trigger logic
pub mod sensor;

// Local image persistence
pub mod storage;

// HTTP multipart upload
pub mod upload;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use capture::{FrameSource, RawFrame, Rotation, TestPatternSource};
pub use config::Config;
pub use context::{ContextPublisher, ContextSelection, Lighting, Traffic, Weather};
pub use dispatch::{trigger_channel, TriggerDispatcher};
pub use pipeline::{CaptureIndicator, CapturePipeline, LogIndicator};
pub use publish::{EventPublisher, ImagePublishedEvent, MqttPublisher};
pub use sensor::{CaptureRequest, SensorFeedListener, SensorSnapshot};
pub use storage::ImageStore;
pub use upload::{HttpUploader, ImageUploader};
