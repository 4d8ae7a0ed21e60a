//! demo - end-to-end synthetic run of the color-trigger loop
//!
//! Drives the controller against the synthetic camera and a printing
//! actuator, so the whole pipeline can be watched without hardware or a
//! servo endpoint on the network.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::Parser;

use huewatch::{
    ActuatorClient, CameraConfig, CameraSource, ColorClass, Command, Controller,
    ControllerSettings, DispatchOutcome, DEFAULT_BLUE_RANGE, DEFAULT_RED_RANGE,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of loop cycles to run.
    #[arg(long, default_value_t = 150)]
    cycles: u64,
    /// Synthetic camera device string.
    #[arg(long, default_value = "stub://demo")]
    device: String,
    /// Frame width.
    #[arg(long, default_value_t = 64)]
    width: u32,
    /// Frame height.
    #[arg(long, default_value_t = 48)]
    height: u32,
    /// Command cooldown in milliseconds.
    #[arg(long, default_value_t = 300)]
    cooldown_ms: u64,
    /// Minimum region area in pixels.
    #[arg(long, default_value_t = 64)]
    min_area: usize,
    /// Delay between cycles in milliseconds.
    #[arg(long, default_value_t = 20)]
    cycle_delay_ms: u64,
}

/// Actuator stand-in that logs every command and always succeeds.
#[derive(Default)]
struct PrintingActuator;

impl ActuatorClient for PrintingActuator {
    fn send(&mut self, command: Command) -> bool {
        log::info!("actuator <- GET /{}", command.wire_name());
        true
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if !args.device.starts_with("stub://") {
        return Err(anyhow!("demo runs against stub:// devices only"));
    }

    let mut source = CameraSource::new(CameraConfig {
        device: args.device.clone(),
        target_fps: 30,
        width: args.width,
        height: args.height,
    })?;
    source.connect()?;

    let settings = ControllerSettings {
        cooldown: Duration::from_millis(args.cooldown_ms),
        colors: vec![
            (ColorClass::Red, DEFAULT_RED_RANGE),
            (ColorClass::Blue, DEFAULT_BLUE_RANGE),
        ],
        min_area: args.min_area,
        downscale: 1,
    };
    let mut controller = Controller::new(source, PrintingActuator::default(), settings);

    let mut sent = 0u64;
    let mut throttled = 0u64;
    for _ in 0..args.cycles {
        let report = controller.run_cycle(Instant::now())?;
        match report.dispatch {
            Some((_, DispatchOutcome::Sent)) => sent += 1,
            Some((_, DispatchOutcome::Throttled)) => throttled += 1,
            _ => {}
        }
        std::thread::sleep(Duration::from_millis(args.cycle_delay_ms));
    }

    log::info!(
        "demo finished: {} cycles, {} commands sent, {} throttled",
        args.cycles,
        sent,
        throttled
    );
    Ok(())
}
