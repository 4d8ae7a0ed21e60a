//! Owned frame container.
//!
//! A `Frame` is a packed RGB24 pixel grid produced once per loop iteration.
//! It is never mutated after creation; downstream stages only derive new
//! values from it (a downscaled copy, an HSV copy, per-color masks).

use anyhow::{anyhow, Result};
use image::imageops::FilterType;
use image::RgbImage;

/// Packed RGB24 frame.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Create a frame from packed RGB bytes.
    ///
    /// The byte length must be exactly `width * height * 3`.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))? as usize;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed RGB bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// RGB channels of the pixel at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let offset = ((y * self.width + x) * 3) as usize;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }

    /// Nearest-neighbor downscale by an integer factor.
    ///
    /// A factor of 1 returns an unchanged copy. Used to shrink frames before
    /// segmentation; detection area thresholds are calibrated against the
    /// downscaled resolution.
    pub fn downscale(&self, factor: u32) -> Result<Self> {
        if factor == 0 {
            return Err(anyhow!("downscale factor must be >= 1"));
        }
        if factor == 1 {
            return Ok(self.clone());
        }
        let new_width = (self.width / factor).max(1);
        let new_height = (self.height / factor).max(1);

        let img = RgbImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))?;
        let resized = image::imageops::resize(&img, new_width, new_height, FilterType::Nearest);

        Frame::from_rgb(resized.into_raw(), new_width, new_height)
    }
}
