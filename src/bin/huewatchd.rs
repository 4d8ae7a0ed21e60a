//! huewatchd - color-trigger daemon
//!
//! This daemon:
//! 1. Loads configuration (file + environment)
//! 2. Opens the configured camera (fatal if it cannot be opened)
//! 3. Runs the perception-to-action loop: segment, detect, throttle,
//!    dispatch
//! 4. Optionally writes debug preview snapshots
//! 5. Exits cleanly on Ctrl-C, or with an error when acquisition fails

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;

use huewatch::{
    CameraSource, Controller, ControllerSettings, HttpActuator, HuewatchdConfig, PreviewSink,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = HuewatchdConfig::load()?;

    log::info!(
        "huewatchd {} starting; actuator={} cooldown={}ms",
        env!("CARGO_PKG_VERSION"),
        cfg.actuator.base_url,
        cfg.cooldown.as_millis()
    );
    log::info!(
        "camera={} {}x{}@{}fps, downscale={}, min_area={}",
        cfg.camera.device,
        cfg.camera.width,
        cfg.camera.height,
        cfg.camera.target_fps,
        cfg.detection.downscale,
        cfg.detection.min_area
    );

    // Camera open failure is startup-fatal: do not enter the loop.
    let mut source = CameraSource::new(cfg.camera.clone())?;
    source.connect()?;

    let client = HttpActuator::from_base_url(&cfg.actuator.base_url, cfg.actuator.timeout)?;

    let settings = ControllerSettings {
        cooldown: cfg.cooldown,
        colors: cfg.colors.ranges(),
        min_area: cfg.detection.min_area,
        downscale: cfg.detection.downscale,
    };
    let mut controller = Controller::new(source, client, settings);
    if let Some(preview) = &cfg.preview {
        log::info!("preview snapshots to {}", preview.path.display());
        controller = controller.with_preview(PreviewSink::new(
            preview.path.clone(),
            preview.interval,
        ));
    }

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::Relaxed);
    })
    .expect("error setting Ctrl-C handler");

    log::info!("huewatchd running (Ctrl-C to stop)");
    if let Err(err) = controller.run(&stop) {
        log::error!("control loop terminated: {:#}", err);
        return Err(err);
    }

    log::info!("huewatchd stopped");
    Ok(())
}
