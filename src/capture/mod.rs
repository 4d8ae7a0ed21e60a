//! Frame acquisition.
//!
//! This module owns the camera device and exposes "fetch the freshest
//! frame". Sources:
//! - `stub://` device strings select a synthetic scene generator (tests,
//!   demo runs)
//! - real device paths select a V4L2 backend (feature: capture-v4l2)
//!
//! The acquisition layer is responsible for:
//! - Configuring resolution and frame rate at connect time (best-effort;
//!   the device may not honor them exactly)
//! - Discarding stale queued frames so reads return the most recent capture
//! - Producing dimension-checked `Frame` instances
//!
//! Failure to open the device at startup is fatal to the process. A read
//! failure mid-run is terminal for the control loop; there is no reconnect
//! logic.

mod camera;

pub use camera::{CameraConfig, CameraSource, CameraStats};

use anyhow::Result;

use crate::frame::Frame;

/// A source of frames for the control loop.
///
/// The loop and its tests depend on this seam, not on a concrete device.
pub trait FrameSource {
    /// Fetch the freshest available frame.
    fn next_frame(&mut self) -> Result<Frame>;

    /// Whether frames are still arriving at roughly the configured rate.
    fn is_healthy(&self) -> bool {
        true
    }
}
