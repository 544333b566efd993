//! Local image persistence
//!
//! One JPEG per capture, named by local capture wall-clock time to
//! millisecond precision. Filenames are unique to the millisecond and sort
//! by creation order under normal clock behavior; two captures inside the
//! same millisecond collide, which is accepted boundary behavior for this
//! trigger cadence. Retention is an external concern; nothing here cleans
//! up old captures.

use anyhow::{Context, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Filename pattern, `yyyyMMdd_HHmmssfff` in chrono terms.
const FILE_NAME_FORMAT: &str = "%Y%m%d_%H%M%S%3f";

/// Persists encoded captures to a process-local directory.
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    /// Create the store, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create storage directory: {:?}", root))?;
        info!("Image store at {:?}", root);
        Ok(Self { root })
    }

    /// Filename for a capture taken at the given instant.
    pub fn file_name_for(at: DateTime<Utc>) -> String {
        format!("{}.jpg", at.format(FILE_NAME_FORMAT))
    }

    /// Full path for a filename inside the store.
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Write encoded bytes under the given filename.
    pub async fn persist(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write capture to {:?}", path))?;
        debug!(file = file_name, size = bytes.len(), "Capture persisted");
        Ok(path)
    }

    /// Read a persisted capture back, as the upload step does.
    pub async fn read_back(&self, file_name: &str) -> Result<Bytes> {
        let path = self.path_for(file_name);
        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read capture back from {:?}", path))?;
        Ok(Bytes::from(data))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
