//! Color segmentation.
//!
//! This module turns an RGB frame into per-class binary masks:
//! - `HsvFrame`: one hue/saturation/value conversion per iteration
//! - `ColorRange`: inclusive componentwise HSV bounds for one color class
//! - `Mask`: the pixels of a frame that fall inside one range
//!
//! Segmentation is a pure function of frame + ranges; it holds no state
//! across iterations.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// Tracked color classes, in dispatch priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColorClass {
    Red,
    Blue,
}

impl ColorClass {
    pub fn label(&self) -> &'static str {
        match self {
            ColorClass::Red => "red",
            ColorClass::Blue => "blue",
        }
    }
}

/// Inclusive HSV bounds for one color class.
///
/// Hue is stored in half-degrees (0..=179) so the full wheel fits in a u8;
/// saturation and value span the full 0..=255 range.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColorRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl ColorRange {
    pub fn new(lower: [u8; 3], upper: [u8; 3]) -> Result<Self> {
        let range = Self { lower, upper };
        range.validate()?;
        Ok(range)
    }

    /// Check the range invariants: componentwise `lower <= upper`, hue
    /// bounds within the half-degree wheel.
    pub fn validate(&self) -> Result<()> {
        for i in 0..3 {
            if self.lower[i] > self.upper[i] {
                return Err(anyhow!(
                    "color range channel {} inverted: lower {} > upper {}",
                    i,
                    self.lower[i],
                    self.upper[i]
                ));
            }
        }
        if self.lower[0] > 179 || self.upper[0] > 179 {
            return Err(anyhow!(
                "hue bounds must be <= 179 (half-degrees), got {}..={}",
                self.lower[0],
                self.upper[0]
            ));
        }
        Ok(())
    }

    /// Componentwise inclusive containment of an HSV pixel.
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| self.lower[i] <= hsv[i] && hsv[i] <= self.upper[i])
    }
}

// ----------------------------------------------------------------------------
// HSV conversion
// ----------------------------------------------------------------------------

/// A frame converted to packed HSV, same dimensions as its RGB source.
pub struct HsvFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl HsvFrame {
    /// Convert an RGB frame to HSV in one pass.
    pub fn from_rgb(frame: &Frame) -> Self {
        let pixels = frame.pixels();
        let mut data = Vec::with_capacity(pixels.len());
        for rgb in pixels.chunks_exact(3) {
            let [h, s, v] = rgb_to_hsv([rgb[0], rgb[1], rgb[2]]);
            data.push(h);
            data.push(s);
            data.push(v);
        }
        Self {
            data,
            width: frame.width(),
            height: frame.height(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// HSV channels of the pixel at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let offset = ((y * self.width + x) * 3) as usize;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }
}

/// Convert one RGB pixel to HSV with hue in half-degrees.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let r = rgb[0] as f32;
    let g = rgb[1] as f32;
    let b = rgb[2] as f32;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let chroma = max - min;

    let value = max;
    let saturation = if max == 0.0 { 0.0 } else { 255.0 * chroma / max };

    let hue_degrees = if chroma == 0.0 {
        0.0
    } else if max == r {
        let mut h = 60.0 * (g - b) / chroma;
        if h < 0.0 {
            h += 360.0;
        }
        h
    } else if max == g {
        60.0 * (b - r) / chroma + 120.0
    } else {
        60.0 * (r - g) / chroma + 240.0
    };

    let hue = ((hue_degrees / 2.0).round() as u16 % 180) as u8;
    [hue, clamp_to_u8(saturation), clamp_to_u8(value)]
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

// ----------------------------------------------------------------------------
// Masks
// ----------------------------------------------------------------------------

/// Binary grid marking the pixels of a frame that fall inside one range.
pub struct Mask {
    bits: Vec<bool>,
    width: u32,
    height: u32,
}

impl Mask {
    /// Threshold an HSV frame against one color range.
    pub fn in_range(hsv: &HsvFrame, range: &ColorRange) -> Self {
        let mut bits = Vec::with_capacity((hsv.width * hsv.height) as usize);
        for hsv_pixel in hsv.data.chunks_exact(3) {
            bits.push(range.contains([hsv_pixel[0], hsv_pixel[1], hsv_pixel[2]]));
        }
        Self {
            bits,
            width: hsv.width,
            height: hsv.height,
        }
    }

    /// Build a mask directly from bits (tests and synthetic scenes).
    pub fn from_bits(bits: Vec<bool>, width: u32, height: u32) -> Result<Self> {
        let expected = width
            .checked_mul(height)
            .ok_or_else(|| anyhow!("mask dimensions overflow"))? as usize;
        if bits.len() != expected {
            return Err(anyhow!(
                "mask length mismatch: expected {}, got {}",
                expected,
                bits.len()
            ));
        }
        Ok(Self {
            bits,
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

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[(y * self.width + x) as usize]
    }

    /// Number of in-range pixels across the whole mask.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }
}

/// Segment a frame against a table of color ranges.
///
/// Converts to HSV once, then thresholds per class. Pure function of
/// frame + ranges.
pub fn segment(frame: &Frame, ranges: &[(ColorClass, ColorRange)]) -> Vec<(ColorClass, Mask)> {
    let hsv = HsvFrame::from_rgb(frame);
    ranges
        .iter()
        .map(|(class, range)| (*class, Mask::in_range(&hsv, range)))
        .collect()
}
