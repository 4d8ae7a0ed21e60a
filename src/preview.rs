//! Debug preview snapshots.
//!
//! The preview is a rate-limited JPEG snapshot of the processed frame,
//! written to a fixed path for human monitoring. It replaces a live preview
//! window: pointing an image viewer (or a browser tab) at the file gives a
//! low-rate view of what the classifier sees, without any GUI toolkit in
//! the loop.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::frame::Frame;

const JPEG_QUALITY: u8 = 80;

/// Rate-limited JPEG snapshot writer.
pub struct PreviewSink {
    path: PathBuf,
    interval: Duration,
    last_write: Option<Instant>,
}

impl PreviewSink {
    pub fn new(path: PathBuf, interval: Duration) -> Self {
        Self {
            path,
            interval,
            last_write: None,
        }
    }

    /// Write a snapshot of `frame`, unless one was written within the
    /// configured interval. Returns whether a snapshot was written.
    pub fn render(&mut self, frame: &Frame, now: Instant) -> Result<bool> {
        if let Some(last) = self.last_write {
            if now.duration_since(last) < self.interval {
                return Ok(false);
            }
        }

        let mut encoded = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY);
        encoder
            .encode(
                frame.pixels(),
                frame.width(),
                frame.height(),
                ExtendedColorType::Rgb8,
            )
            .context("encode preview frame")?;

        std::fs::write(&self.path, &encoded)
            .with_context(|| format!("write preview snapshot to {}", self.path.display()))?;

        self.last_write = Some(now);
        Ok(true)
    }
}
