//! HTTP multipart upload
//!
//! Ships a captured JPEG to the collection endpoint as one multipart file
//! part named `"file"`. Best-effort by design: a failed upload is logged by
//! the pipeline and does not block the capture event from being announced.

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use std::time::Duration;
use tracing::debug;

/// Upload capability, pluggable so tests can substitute fakes.
#[async_trait::async_trait]
pub trait ImageUploader: Send + Sync {
    /// POST the image bytes under the given filename.
    async fn upload(&self, file_name: &str, bytes: Bytes) -> Result<()>;
}

/// Uploads to a fixed HTTP endpoint via multipart POST.
pub struct HttpUploader {
    client: reqwest::Client,
    url: String,
}

impl HttpUploader {
    /// Create an uploader for the configured endpoint.
    ///
    /// The client timeout is the only bound on a stalled upload; the
    /// pipeline imposes no run-level timeout of its own.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait::async_trait]
impl ImageUploader for HttpUploader {
    async fn upload(&self, file_name: &str, bytes: Bytes) -> Result<()> {
        let part = reqwest::multipart::Part::stream(bytes)
            .file_name(file_name.to_string())
            .mime_str("image/jpeg")
            .context("Invalid mime type for upload part")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Upload POST to {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Upload endpoint returned {}", status);
        }

        debug!(file = file_name, "Upload accepted by endpoint");
        Ok(())
    }
}
