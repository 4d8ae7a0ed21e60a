//! Daemon configuration.
//!
//! Settings come from an optional JSON file named by `HUEWATCH_CONFIG`,
//! with per-field defaults and environment-variable overrides. Everything
//! is fixed at startup; nothing is runtime-reconfigurable.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::CameraConfig;
use crate::segment::{ColorClass, ColorRange};

const DEFAULT_ACTUATOR_URL: &str = "http://192.168.137.134";
const DEFAULT_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_COOLDOWN_MS: u64 = 1_500;
const DEFAULT_MIN_AREA: usize = 1_000;
const DEFAULT_DOWNSCALE: u32 = 2;
const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
const DEFAULT_CAMERA_FPS: u32 = 30;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_PREVIEW_INTERVAL_MS: u64 = 500;

/// Default red bounds, hue in half-degrees.
pub const DEFAULT_RED_RANGE: ColorRange = ColorRange {
    lower: [0, 120, 70],
    upper: [10, 255, 255],
};

/// Default blue bounds, hue in half-degrees.
pub const DEFAULT_BLUE_RANGE: ColorRange = ColorRange {
    lower: [100, 150, 50],
    upper: [130, 255, 255],
};

#[derive(Debug, Deserialize, Default)]
struct HuewatchdConfigFile {
    actuator: Option<ActuatorConfigFile>,
    throttle: Option<ThrottleConfigFile>,
    camera: Option<CameraConfigFile>,
    detect: Option<DetectConfigFile>,
    colors: Option<ColorsConfigFile>,
    preview: Option<PreviewConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ActuatorConfigFile {
    base_url: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct ThrottleConfigFile {
    cooldown_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectConfigFile {
    min_area: Option<usize>,
    downscale: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ColorsConfigFile {
    red: Option<ColorRange>,
    blue: Option<ColorRange>,
}

#[derive(Debug, Deserialize, Default)]
struct PreviewConfigFile {
    path: Option<PathBuf>,
    interval_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct HuewatchdConfig {
    pub actuator: ActuatorSettings,
    pub cooldown: Duration,
    pub camera: CameraConfig,
    pub detection: DetectionSettings,
    pub colors: ColorTable,
    pub preview: Option<PreviewSettings>,
}

#[derive(Debug, Clone)]
pub struct ActuatorSettings {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DetectionSettings {
    /// Minimum region area in pixels, calibrated against the downscaled
    /// resolution.
    pub min_area: usize,
    /// Integer downscale factor applied before segmentation (1 = off).
    pub downscale: u32,
}

#[derive(Debug, Clone)]
pub struct ColorTable {
    pub red: ColorRange,
    pub blue: ColorRange,
}

impl ColorTable {
    /// Ranges in dispatch priority order.
    pub fn ranges(&self) -> Vec<(ColorClass, ColorRange)> {
        vec![(ColorClass::Red, self.red), (ColorClass::Blue, self.blue)]
    }
}

#[derive(Debug, Clone)]
pub struct PreviewSettings {
    pub path: PathBuf,
    pub interval: Duration,
}

impl HuewatchdConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("HUEWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: HuewatchdConfigFile) -> Self {
        let actuator = ActuatorSettings {
            base_url: file
                .actuator
                .as_ref()
                .and_then(|actuator| actuator.base_url.clone())
                .unwrap_or_else(|| DEFAULT_ACTUATOR_URL.to_string()),
            timeout: Duration::from_millis(
                file.actuator
                    .as_ref()
                    .and_then(|actuator| actuator.timeout_ms)
                    .unwrap_or(DEFAULT_TIMEOUT_MS),
            ),
        };
        let cooldown = Duration::from_millis(
            file.throttle
                .and_then(|throttle| throttle.cooldown_ms)
                .unwrap_or(DEFAULT_COOLDOWN_MS),
        );
        let camera = CameraConfig {
            device: file
                .camera
                .as_ref()
                .and_then(|camera| camera.device.clone())
                .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
            target_fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.target_fps)
                .unwrap_or(DEFAULT_CAMERA_FPS),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_CAMERA_HEIGHT),
        };
        let detection = DetectionSettings {
            min_area: file
                .detect
                .as_ref()
                .and_then(|detect| detect.min_area)
                .unwrap_or(DEFAULT_MIN_AREA),
            downscale: file
                .detect
                .as_ref()
                .and_then(|detect| detect.downscale)
                .unwrap_or(DEFAULT_DOWNSCALE),
        };
        let colors = ColorTable {
            red: file
                .colors
                .as_ref()
                .and_then(|colors| colors.red)
                .unwrap_or(DEFAULT_RED_RANGE),
            blue: file
                .colors
                .as_ref()
                .and_then(|colors| colors.blue)
                .unwrap_or(DEFAULT_BLUE_RANGE),
        };
        let preview = file.preview.and_then(|preview| {
            preview.path.map(|path| PreviewSettings {
                path,
                interval: Duration::from_millis(
                    preview.interval_ms.unwrap_or(DEFAULT_PREVIEW_INTERVAL_MS),
                ),
            })
        });
        Self {
            actuator,
            cooldown,
            camera,
            detection,
            colors,
            preview,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("HUEWATCH_ACTUATOR_URL") {
            if !url.trim().is_empty() {
                self.actuator.base_url = url;
            }
        }
        if let Ok(timeout) = std::env::var("HUEWATCH_TIMEOUT_MS") {
            let ms: u64 = timeout
                .parse()
                .map_err(|_| anyhow!("HUEWATCH_TIMEOUT_MS must be an integer of milliseconds"))?;
            self.actuator.timeout = Duration::from_millis(ms);
        }
        if let Ok(cooldown) = std::env::var("HUEWATCH_COOLDOWN_MS") {
            let ms: u64 = cooldown
                .parse()
                .map_err(|_| anyhow!("HUEWATCH_COOLDOWN_MS must be an integer of milliseconds"))?;
            self.cooldown = Duration::from_millis(ms);
        }
        if let Ok(device) = std::env::var("HUEWATCH_CAMERA_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(min_area) = std::env::var("HUEWATCH_MIN_AREA") {
            let area: usize = min_area
                .parse()
                .map_err(|_| anyhow!("HUEWATCH_MIN_AREA must be an integer pixel count"))?;
            self.detection.min_area = area;
        }
        if let Ok(path) = std::env::var("HUEWATCH_PREVIEW_PATH") {
            if !path.trim().is_empty() {
                let interval = self
                    .preview
                    .as_ref()
                    .map(|preview| preview.interval)
                    .unwrap_or(Duration::from_millis(DEFAULT_PREVIEW_INTERVAL_MS));
                self.preview = Some(PreviewSettings {
                    path: PathBuf::from(path),
                    interval,
                });
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.actuator.base_url)
            .map_err(|e| anyhow!("invalid actuator base url: {}", e))?;
        if self.actuator.timeout.is_zero() {
            return Err(anyhow!("actuator timeout must be greater than zero"));
        }
        if self.cooldown.is_zero() {
            return Err(anyhow!("command cooldown must be greater than zero"));
        }
        if self.detection.min_area == 0 {
            return Err(anyhow!("minimum detection area must be at least 1 pixel"));
        }
        if self.detection.downscale == 0 {
            return Err(anyhow!("downscale factor must be at least 1"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera resolution must be nonzero"));
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera frame rate must be at least 1"));
        }
        self.colors.red.validate()?;
        self.colors.blue.validate()?;
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<HuewatchdConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
