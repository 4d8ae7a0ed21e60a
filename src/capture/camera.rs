//! Camera frame source.
//!
//! `CameraSource` wraps either a real V4L2 device or a synthetic scene
//! generator selected by a `stub://` device string. The synthetic backend
//! cycles through scenes a classifier can act on: neutral background, a red
//! patch, a blue patch.

use anyhow::Result;
#[cfg(feature = "capture-v4l2")]
use anyhow::Context;
#[cfg(feature = "capture-v4l2")]
use ouroboros::self_referencing;
#[cfg(feature = "capture-v4l2")]
use std::time::{Duration, Instant};

use super::FrameSource;
use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0"), or "stub://" for synthetic frames.
    pub device: String,
    /// Target frame rate (best-effort).
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 30,
            width: 640,
            height: 480,
        }
    }
}

/// Camera frame source.
///
/// Uses V4L2 for real devices, with a synthetic fallback for `stub://`
/// device strings.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCameraSource),
    #[cfg(feature = "capture-v4l2")]
    Device(DeviceCameraSource),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.device.starts_with("stub://") {
            Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCameraSource::new(config)),
            })
        } else {
            #[cfg(feature = "capture-v4l2")]
            {
                Ok(Self {
                    backend: CameraBackend::Device(DeviceCameraSource::new(config)?),
                })
            }
            #[cfg(not(feature = "capture-v4l2"))]
            {
                anyhow::bail!("camera devices require the capture-v4l2 feature")
            }
        }
    }

    /// Open the device and apply the requested format.
    ///
    /// Failure here is startup-fatal: the process must not enter the
    /// control loop without a working source.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.connect(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.stats(),
        }
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.next_frame(),
        }
    }

    fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.is_healthy(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.is_healthy(),
        }
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub device: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and demo runs
// ----------------------------------------------------------------------------

/// Frames per synthetic scene before the generator moves to the next one.
const SCENE_PERIOD_FRAMES: u64 = 25;

const BACKGROUND_RGB: [u8; 3] = [96, 96, 96];
const RED_PATCH_RGB: [u8; 3] = [200, 16, 16];
const BLUE_PATCH_RGB: [u8; 3] = [16, 16, 200];

struct SyntheticCameraSource {
    config: CameraConfig,
    frame_count: u64,
}

impl SyntheticCameraSource {
    fn new(config: CameraConfig) -> Self {
        Self {
            config,
            frame_count: 0,
        }
    }

    /// Synthetic sources are always "connected".
    fn connect(&mut self) -> Result<()> {
        log::info!(
            "CameraSource: connected to {} (synthetic)",
            self.config.device
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let scene = (self.frame_count / SCENE_PERIOD_FRAMES) % 4;
        self.frame_count += 1;
        self.generate_scene(scene)
    }

    /// Generate the current scene.
    ///
    /// Scenes cycle: background, red patch, background, blue patch. The
    /// patch covers the central quarter of the frame so it survives
    /// downscaling well above any sensible area threshold.
    fn generate_scene(&self, scene: u64) -> Result<Frame> {
        let width = self.config.width;
        let height = self.config.height;
        let patch = match scene {
            1 => Some(RED_PATCH_RGB),
            3 => Some(BLUE_PATCH_RGB),
            _ => None,
        };

        let x0 = width / 4;
        let x1 = width - width / 4;
        let y0 = height / 4;
        let y1 = height - height / 4;

        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let rgb = match patch {
                    Some(rgb) if x0 <= x && x < x1 && y0 <= y && y < y1 => rgb,
                    _ => BACKGROUND_RGB,
                };
                data.extend_from_slice(&rgb);
            }
        }

        Frame::from_rgb(data, width, height)
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Production V4L2 source
// ----------------------------------------------------------------------------

/// Mmap buffers requested from the driver. Kept small so at most one stale
/// frame can queue between reads.
#[cfg(feature = "capture-v4l2")]
const STREAM_BUFFERS: u32 = 2;

#[cfg(feature = "capture-v4l2")]
struct DeviceCameraSource {
    config: CameraConfig,
    state: Option<DeviceCameraState>,
    frame_count: u64,
    last_frame_at: Option<Instant>,
    last_error: Option<String>,
    active_width: u32,
    active_height: u32,
}

#[cfg(feature = "capture-v4l2")]
#[self_referencing]
struct DeviceCameraState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

#[cfg(feature = "capture-v4l2")]
impl DeviceCameraSource {
    fn new(config: CameraConfig) -> Result<Self> {
        Ok(Self {
            active_width: config.width,
            active_height: config.height,
            config,
            state: None,
            frame_count: 0,
            last_frame_at: None,
            last_error: None,
        })
    }

    fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open camera device {}", self.config.device))?;
        let mut format = device.format().context("read camera format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "CameraSource: failed to set format on {}: {}",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .context("read camera format after set failure")?
            }
        };

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "CameraSource: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;
        self.last_error = None;

        let state = DeviceCameraStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, STREAM_BUFFERS)
                    .map_err(|err| anyhow::Error::new(err).context("create camera buffer stream"))
            },
        }
        .try_build()
        .map_err(|err| {
            self.last_error = Some(err.to_string());
            err
        })?;
        self.state = Some(state);

        log::info!(
            "CameraSource: connected to {} ({}x{})",
            self.config.device,
            self.active_width,
            self.active_height
        );
        Ok(())
    }

    /// Capture the freshest frame.
    ///
    /// Dequeues and discards the driver's queued frames first, so the
    /// returned frame is the most recent capture. Bounds end-to-end latency
    /// at the cost of dropping frames under load.
    fn next_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("camera device not connected")?;

        for _ in 0..STREAM_BUFFERS.saturating_sub(1) {
            state.with_mut(|fields| fields.stream.next()).map_err(|err| {
                self.last_error = Some(err.to_string());
                anyhow::Error::new(err).context("drain stale camera frame")
            })?;
        }

        let expected = (self.active_width * self.active_height * 3) as usize;
        let data = {
            let (buf, _meta) = state
                .with_mut(|fields| fields.stream.next())
                .map_err(|err| {
                    self.last_error = Some(err.to_string());
                    anyhow::Error::new(err).context("capture camera frame")
                })?;
            if buf.len() < expected {
                anyhow::bail!(
                    "camera frame too short: expected {} bytes, got {}",
                    expected,
                    buf.len()
                );
            }
            // Drivers may pad the buffer past the packed frame size.
            buf[..expected].to_vec()
        };

        self.frame_count += 1;
        self.last_frame_at = Some(Instant::now());

        Frame::from_rgb(data, self.active_width, self.active_height)
    }

    fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        let Some(last_frame_at) = self.last_frame_at else {
            return true;
        };
        last_frame_at.elapsed() <= self.health_grace()
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }

    fn health_grace(&self) -> Duration {
        let base_ms = if self.config.target_fps == 0 {
            2_000
        } else {
            (1000 / self.config.target_fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
