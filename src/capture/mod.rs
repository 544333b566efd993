//! Frame acquisition and encoding
//!
//! The physical capture device sits behind the [`FrameSource`] trait; the
//! pipeline only ever sees raw RGB24 buffers. A synthetic test-pattern
//! source stands in when no real device is wired up.

pub mod rotate;

pub use rotate::Rotation;

use anyhow::{ensure, Context, Result};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

/// One raw pixel buffer, RGB24, row-major from the top-left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    /// `width * height * 3` bytes
    pub pixels: Vec<u8>,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        ensure!(
            pixels.len() == (width as usize) * (height as usize) * 3,
            "Pixel buffer length {} does not match {}x{} RGB24",
            pixels.len(),
            width,
            height
        );
        Ok(Self {
            width,
            height,
            pixels,
        })
    }
}

/// Produces the current pixel buffer on demand.
#[async_trait::async_trait]
pub trait FrameSource: Send + Sync {
    /// Grab the most recently rendered frame.
    async fn acquire(&self) -> Result<RawFrame>;
}

/// Synthetic gradient source for running without camera hardware.
pub struct TestPatternSource {
    width: u32,
    height: u32,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[async_trait::async_trait]
impl FrameSource for TestPatternSource {
    async fn acquire(&self) -> Result<RawFrame> {
        let mut pixels = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                pixels.push((x * 255 / self.width.max(1)) as u8);
                pixels.push((y * 255 / self.height.max(1)) as u8);
                pixels.push(128);
            }
        }
        RawFrame::new(self.width, self.height, pixels)
    }
}

/// Encode a raw frame as JPEG.
pub fn encode_jpeg(frame: &RawFrame, quality: u8) -> Result<Bytes> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder
        .write_image(
            &frame.pixels,
            frame.width,
            frame.height,
            ExtendedColorType::Rgb8,
        )
        .context("JPEG encoding failed")?;
    Ok(Bytes::from(out))
}
