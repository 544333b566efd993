//! Capture pipeline
//!
//! One triggered capture runs through a fixed sequence: indicator on, frame
//! acquisition (plus static rotation), JPEG encode, local persist, upload,
//! event publish, indicator off. Every step's failure is isolated: an upload
//! error never blocks the event publish, and nothing propagates back to the
//! dispatcher. Image buffers live only for the duration of one run.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::capture::rotate::rotate;
use crate::capture::{encode_jpeg, FrameSource, Rotation};
use crate::publish::{EventPublisher, ImagePublishedEvent};
use crate::sensor::CaptureRequest;
use crate::storage::ImageStore;
use crate::upload::ImageUploader;

/// Best-effort capture-in-progress signal.
///
/// Failures here are ignorable by contract; implementations must not panic.
pub trait CaptureIndicator: Send + Sync {
    fn set_active(&self, active: bool);
}

/// Default indicator that just logs the state change.
pub struct LogIndicator;

impl CaptureIndicator for LogIndicator {
    fn set_active(&self, active: bool) {
        debug!(active, "Capture indicator");
    }
}

/// Static pipeline settings, fixed per deployment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Rotation applied to every acquired frame
    pub rotation: Rotation,
    /// Topic the capture event is announced on
    pub image_topic: String,
    /// JPEG encoder quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rotation: Rotation::None,
            image_topic: "cam/new_image".to_string(),
            jpeg_quality: 85,
        }
    }
}

/// Orchestrates one capture run end to end.
pub struct CapturePipeline {
    config: PipelineConfig,
    source: Arc<dyn FrameSource>,
    store: ImageStore,
    uploader: Arc<dyn ImageUploader>,
    publisher: Arc<dyn EventPublisher>,
    indicator: Arc<dyn CaptureIndicator>,
}

impl CapturePipeline {
    pub fn new(
        config: PipelineConfig,
        source: Arc<dyn FrameSource>,
        store: ImageStore,
        uploader: Arc<dyn ImageUploader>,
        publisher: Arc<dyn EventPublisher>,
        indicator: Arc<dyn CaptureIndicator>,
    ) -> Self {
        Self {
            config,
            source,
            store,
            uploader,
            publisher,
            indicator,
        }
    }

    /// Run one capture for the given request. Never returns an error; all
    /// failures are logged here so the dispatcher stays free for the next
    /// trigger. The indicator is switched off even when a step fails.
    pub async fn run(&self, request: CaptureRequest) {
        self.indicator.set_active(true);

        if let Err(e) = self.execute(request).await {
            warn!(seq = request.seq, "Capture run failed: {:#}", e);
        }

        self.indicator.set_active(false);
    }

    async fn execute(&self, request: CaptureRequest) -> Result<()> {
        // Yield once so the host loop finishes the frame we are about to grab
        tokio::task::yield_now().await;

        let frame = self
            .source
            .acquire()
            .await
            .context("Frame acquisition failed")?;
        let frame = rotate(frame, self.config.rotation);

        let encoded = encode_jpeg(&frame, self.config.jpeg_quality)?;
        drop(frame);

        let captured_at = Utc::now();
        let file_name = ImageStore::file_name_for(captured_at);
        let path = self.store.persist(&file_name, &encoded).await?;
        drop(encoded);
        info!(file = %file_name, path = ?path, "Captured");

        // Timestamps for the outgoing event: Tphoto here, the other two were
        // pinned into the request when the trigger fired. None of them are
        // re-read later in the run.
        let tphoto = Utc::now().timestamp_millis();
        let event = ImagePublishedEvent {
            file: file_name.clone(),
            timestamp: request.snapshot.received_at_ms,
            ta: request.snapshot.arduino_time_ms,
            tphoto,
        };

        // Upload is best-effort: on failure the event is still announced so
        // downstream consumers know a capture was attempted.
        match self.store.read_back(&file_name).await {
            Ok(bytes) => {
                if let Err(e) = self.uploader.upload(&file_name, bytes).await {
                    warn!(file = %file_name, "Upload failed: {:#}", e);
                } else {
                    info!(file = %file_name, "Uploaded");
                }
            }
            Err(e) => {
                warn!(file = %file_name, "Could not read capture back for upload: {:#}", e);
            }
        }

        self.publish_event(&event).await;

        Ok(())
    }

    /// Announce the capture on the image topic, skipping silently when the
    /// publish connection is down. No buffering, no retry.
    async fn publish_event(&self, event: &ImagePublishedEvent) {
        if !self.publisher.is_connected() {
            debug!(file = %event.file, "Publish connection down, skipping capture event");
            return;
        }

        let payload = match serde_json::to_vec(event) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to encode capture event: {}", e);
                return;
            }
        };

        match self
            .publisher
            .publish(&self.config.image_topic, payload.into())
            .await
        {
            Ok(()) => info!(
                topic = %self.config.image_topic,
                file = %event.file,
                ta = event.ta,
                "Published capture event"
            ),
            Err(e) => warn!("Capture event publish failed: {:#}", e),
        }
    }
}
