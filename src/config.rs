//! Agent configuration
//!
//! All values are static per deployment: broker address, the three topic
//! names, the upload URL, trigger threshold, and rotation. Read once from
//! `ROADCAM_*` environment variables at startup; nothing is runtime-mutable.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::capture::Rotation;

/// Agent configuration from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// MQTT broker host
    pub broker_host: String,
    /// MQTT broker port
    pub broker_port: u16,
    /// Inbound sensor-status topic
    pub sensor_topic: String,
    /// Outbound capture-event topic
    pub image_topic: String,
    /// Outbound context-selection topic
    pub context_topic: String,
    /// Upload endpoint URL
    pub upload_url: String,
    /// Sensor messages between automatic captures
    pub trigger_threshold: u64,
    /// Fixed rotation applied to every frame
    pub rotation: Rotation,
    /// Directory captures are persisted to
    pub storage_dir: PathBuf,
    /// Upload transport timeout
    pub upload_timeout: Duration,
    /// JPEG encoder quality (1-100)
    pub jpeg_quality: u8,
    /// Test pattern dimensions when no camera is wired up
    pub frame_width: u32,
    pub frame_height: u32,
    /// Initial context selection option strings
    pub lighting: Option<String>,
    pub weather: Option<String>,
    pub traffic: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let broker_host =
            std::env::var("ROADCAM_BROKER_HOST").unwrap_or_else(|_| "192.168.137.1".to_string());

        let broker_port: u16 = std::env::var("ROADCAM_BROKER_PORT")
            .ok()
            .map(|s| s.parse().context("Invalid ROADCAM_BROKER_PORT"))
            .transpose()?
            .unwrap_or(1883);

        let sensor_topic =
            std::env::var("ROADCAM_SENSOR_TOPIC").unwrap_or_else(|_| "traffic/status".to_string());
        let image_topic =
            std::env::var("ROADCAM_IMAGE_TOPIC").unwrap_or_else(|_| "cam/new_image".to_string());
        let context_topic = std::env::var("ROADCAM_CONTEXT_TOPIC")
            .unwrap_or_else(|_| "cam/conditions".to_string());

        let upload_url = std::env::var("ROADCAM_UPLOAD_URL")
            .unwrap_or_else(|_| "http://192.168.137.1:5000/upload".to_string());

        let trigger_threshold: u64 = std::env::var("ROADCAM_TRIGGER_THRESHOLD")
            .ok()
            .map(|s| s.parse().context("Invalid ROADCAM_TRIGGER_THRESHOLD"))
            .transpose()?
            .unwrap_or(5);

        let rotation = std::env::var("ROADCAM_ROTATION")
            .ok()
            .map(|s| s.parse::<Rotation>())
            .transpose()?
            .unwrap_or(Rotation::None);

        let storage_dir = std::env::var("ROADCAM_STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/var/lib/roadcam/captures"));

        let upload_timeout_secs: u64 = std::env::var("ROADCAM_UPLOAD_TIMEOUT_SECS")
            .ok()
            .map(|s| s.parse().context("Invalid ROADCAM_UPLOAD_TIMEOUT_SECS"))
            .transpose()?
            .unwrap_or(30);

        let jpeg_quality: u8 = std::env::var("ROADCAM_JPEG_QUALITY")
            .ok()
            .map(|s| s.parse().context("Invalid ROADCAM_JPEG_QUALITY"))
            .transpose()?
            .unwrap_or(85);

        let frame_width: u32 = std::env::var("ROADCAM_WIDTH")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1280);

        let frame_height: u32 = std::env::var("ROADCAM_HEIGHT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(720);

        let lighting = std::env::var("ROADCAM_LIGHTING").ok();
        let weather = std::env::var("ROADCAM_WEATHER").ok();
        let traffic = std::env::var("ROADCAM_TRAFFIC").ok();

        Ok(Self {
            broker_host,
            broker_port,
            sensor_topic,
            image_topic,
            context_topic,
            upload_url,
            trigger_threshold,
            rotation,
            storage_dir,
            upload_timeout: Duration::from_secs(upload_timeout_secs),
            jpeg_quality,
            frame_width,
            frame_height,
            lighting,
            weather,
            traffic,
        })
    }
}
