//! Fixed 90-degree rotation
//!
//! Per-deployment static choice: some cameras are mounted sideways. The
//! remap swaps width and height; for a source pixel `(x, y)` in a `w x h`
//! buffer the destination pixel index is `x*h + (h-1-y)` clockwise and
//! `(w-1-x)*h + y` counter-clockwise.

use anyhow::{bail, Result};
use std::fmt;
use std::str::FromStr;

use super::RawFrame;

/// Rotation applied to every acquired frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Clockwise,
    CounterClockwise,
}

impl FromStr for Rotation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Rotation::None),
            "cw" => Ok(Rotation::Clockwise),
            "ccw" => Ok(Rotation::CounterClockwise),
            other => bail!("Unknown rotation '{}' (expected none, cw, ccw)", other),
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rotation::None => "none",
            Rotation::Clockwise => "cw",
            Rotation::CounterClockwise => "ccw",
        };
        f.write_str(s)
    }
}

/// Apply the configured rotation, returning a buffer with swapped dimensions.
///
/// `Rotation::None` hands the frame back untouched.
pub fn rotate(frame: RawFrame, rotation: Rotation) -> RawFrame {
    if rotation == Rotation::None {
        return frame;
    }

    let w = frame.width as usize;
    let h = frame.height as usize;
    let mut out = vec![0u8; w * h * 3];

    for y in 0..h {
        for x in 0..w {
            let src = (y * w + x) * 3;
            let dst_px = match rotation {
                Rotation::Clockwise => x * h + (h - 1 - y),
                Rotation::CounterClockwise => (w - 1 - x) * h + y,
                Rotation::None => unreachable!(),
            };
            let dst = dst_px * 3;
            out[dst..dst + 3].copy_from_slice(&frame.pixels[src..src + 3]);
        }
    }

    RawFrame {
        width: frame.height,
        height: frame.width,
        pixels: out,
    }
}
