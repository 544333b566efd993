//! Trigger dispatch
//!
//! A single-slot channel connects the sensor listener to the capture
//! pipeline. The slot holds at most one pending [`CaptureRequest`]; a second
//! trigger arriving before the first is serviced overwrites it, which is the
//! coalescing the capture logic wants: no queue, no count of missed
//! triggers, at most one deferred run while a run is executing.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::pipeline::CapturePipeline;
use crate::sensor::CaptureRequest;

/// Create the single-slot trigger channel shared by listener and dispatcher.
pub fn trigger_channel() -> (
    watch::Sender<Option<CaptureRequest>>,
    watch::Receiver<Option<CaptureRequest>>,
) {
    watch::channel(None)
}

/// Drains the trigger slot and runs one pipeline at a time.
///
/// Runs never overlap: the slot is cleared before the pipeline starts, and
/// the next request is only looked at after the previous run finished all of
/// its steps (upload included). Triggers raised mid-run coalesce into the
/// slot and are serviced on the next pass.
pub struct TriggerDispatcher {
    trigger_rx: watch::Receiver<Option<CaptureRequest>>,
    pipeline: Arc<CapturePipeline>,
}

impl TriggerDispatcher {
    pub fn new(
        trigger_rx: watch::Receiver<Option<CaptureRequest>>,
        pipeline: Arc<CapturePipeline>,
    ) -> Self {
        Self {
            trigger_rx,
            pipeline,
        }
    }

    /// Run until the trigger sender is dropped.
    pub async fn run(mut self) {
        info!("Trigger dispatcher started");

        while self.trigger_rx.changed().await.is_ok() {
            // Take the latest pending request, clearing the slot
            let request = *self.trigger_rx.borrow_and_update();
            let Some(request) = request else { continue };

            debug!(seq = request.seq, "Servicing capture trigger");
            self.pipeline.run(request).await;
        }

        info!("Trigger channel closed, dispatcher stopping");
    }
}
