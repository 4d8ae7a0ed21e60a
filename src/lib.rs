//! huewatch - color-triggered servo controller
//!
//! This crate watches a live camera feed, classifies each frame as showing
//! a red object, a blue object, or neither, and drives a remote servo
//! controller over HTTP based on the classification.
//!
//! # Architecture
//!
//! The perception-to-action cycle, in dependency order:
//!
//! 1. **Frame source** fetches the freshest camera frame, discarding stale
//!    queued captures to bound latency.
//! 2. **Segmentation** converts the frame to HSV once and thresholds it
//!    against per-class color ranges, yielding binary masks.
//! 3. **Detection** extracts connected regions per mask and reports a class
//!    as present when any region meets the minimum area (inclusive).
//! 4. **Throttling** enforces a minimum interval between successfully
//!    dispatched commands; failures never extend the lockout.
//! 5. **Dispatch** issues a single bounded-timeout HTTP GET per command;
//!    any failure is logged and reported as boolean failure, never raised.
//!
//! The loop is single-threaded and synchronous: each cycle completes fully
//! before the next begins. The only cross-frame state is the command gate's
//! last-success timestamp.
//!
//! # Module Structure
//!
//! - `capture`: camera frame sources (V4L2 device, synthetic stub)
//! - `frame`: owned RGB frame container
//! - `segment`: HSV conversion, color ranges, masks
//! - `detect`: connected regions and presence decisions
//! - `throttle`: the command gate
//! - `actuator`: commands and the HTTP client seam
//! - `controller`: the per-frame orchestration loop
//! - `preview`: rate-limited JPEG debug snapshots
//! - `config`: file + env configuration for the daemon

pub mod actuator;
pub mod capture;
pub mod config;
pub mod controller;
pub mod detect;
pub mod frame;
pub mod preview;
pub mod segment;
pub mod throttle;

pub use actuator::{ActuatorClient, Command, HttpActuator};
pub use capture::{CameraConfig, CameraSource, CameraStats, FrameSource};
pub use config::{HuewatchdConfig, DEFAULT_BLUE_RANGE, DEFAULT_RED_RANGE};
pub use controller::{Controller, ControllerSettings, CycleReport};
pub use detect::{detect_classes, has_region_at_least, region_areas, Detections};
pub use frame::Frame;
pub use preview::PreviewSink;
pub use segment::{rgb_to_hsv, segment, ColorClass, ColorRange, HsvFrame, Mask};
pub use throttle::{CommandGate, DispatchOutcome};
