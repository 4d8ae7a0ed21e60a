//! End-to-end control loop scenarios through the public API.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use huewatch::{
    ActuatorClient, ColorClass, Command, Controller, ControllerSettings, DispatchOutcome, Frame,
    FrameSource, DEFAULT_BLUE_RANGE, DEFAULT_RED_RANGE,
};

const RED: [u8; 3] = [200, 16, 16];
const BLUE: [u8; 3] = [16, 16, 200];
const GRAY: [u8; 3] = [96, 96, 96];

/// 100x100 gray frame with a colored rectangle of exactly `w * h` pixels.
fn frame_with_patch(rgb: [u8; 3], w: u32, h: u32) -> Frame {
    let mut data = Vec::with_capacity(100 * 100 * 3);
    for y in 0..100u32 {
        for x in 0..100u32 {
            let pixel = if x < w && y < h { rgb } else { GRAY };
            data.extend_from_slice(&pixel);
        }
    }
    Frame::from_rgb(data, 100, 100).unwrap()
}

struct QueueSource {
    frames: VecDeque<Frame>,
}

impl FrameSource for QueueSource {
    fn next_frame(&mut self) -> Result<Frame> {
        self.frames
            .pop_front()
            .ok_or_else(|| anyhow!("frame source exhausted"))
    }
}

#[derive(Clone)]
struct RecordingClient {
    calls: Rc<RefCell<Vec<Command>>>,
    succeed: bool,
}

impl ActuatorClient for RecordingClient {
    fn send(&mut self, command: Command) -> bool {
        self.calls.borrow_mut().push(command);
        self.succeed
    }
}

fn settings() -> ControllerSettings {
    ControllerSettings {
        cooldown: Duration::from_millis(1_500),
        colors: vec![
            (ColorClass::Red, DEFAULT_RED_RANGE),
            (ColorClass::Blue, DEFAULT_BLUE_RANGE),
        ],
        min_area: 1_000,
        downscale: 1,
    }
}

#[test]
fn cooldown_scenario_matches_the_contract() -> Result<()> {
    // Frame 1 (t=0): red region of 1500 px -> "up" sent.
    // Frame 2 (t=0.5s): red region of 2000 px -> throttled, no request.
    // Frame 3 (t=1.6s): blue region of 1200 px -> "down" sent.
    let frames = VecDeque::from(vec![
        frame_with_patch(RED, 50, 30),
        frame_with_patch(RED, 50, 40),
        frame_with_patch(BLUE, 40, 30),
    ]);
    let calls = Rc::new(RefCell::new(Vec::new()));
    let client = RecordingClient {
        calls: calls.clone(),
        succeed: true,
    };
    let mut controller = Controller::new(QueueSource { frames }, client, settings());

    let t0 = Instant::now();

    let report = controller.run_cycle(t0)?;
    assert_eq!(report.dispatch, Some((Command::Raise, DispatchOutcome::Sent)));

    let report = controller.run_cycle(t0 + Duration::from_millis(500))?;
    assert!(report.detections.red);
    assert_eq!(
        report.dispatch,
        Some((Command::Raise, DispatchOutcome::Throttled))
    );
    // The throttled attempt never reached the actuator.
    assert_eq!(calls.borrow().len(), 1);

    let report = controller.run_cycle(t0 + Duration::from_millis(1_600))?;
    assert_eq!(report.dispatch, Some((Command::Lower, DispatchOutcome::Sent)));

    assert_eq!(*calls.borrow(), vec![Command::Raise, Command::Lower]);
    Ok(())
}

#[test]
fn region_at_exactly_min_area_is_detected() -> Result<()> {
    // 40x25 = 1000 px, exactly min_area: inclusive threshold.
    let frames = VecDeque::from(vec![
        frame_with_patch(RED, 40, 25),
        frame_with_patch(RED, 37, 27), // 999 px
    ]);
    let calls = Rc::new(RefCell::new(Vec::new()));
    let client = RecordingClient {
        calls: calls.clone(),
        succeed: true,
    };
    let mut controller = Controller::new(QueueSource { frames }, client, settings());

    let t0 = Instant::now();
    let report = controller.run_cycle(t0)?;
    assert!(report.detections.red);

    let report = controller.run_cycle(t0 + Duration::from_secs(10))?;
    assert!(!report.detections.red);
    assert!(report.dispatch.is_none());

    assert_eq!(calls.borrow().len(), 1);
    Ok(())
}

#[test]
fn unreachable_actuator_is_logged_not_fatal() -> Result<()> {
    let frames = VecDeque::from(vec![frame_with_patch(RED, 50, 30); 10]);
    let calls = Rc::new(RefCell::new(Vec::new()));
    let client = RecordingClient {
        calls: calls.clone(),
        succeed: false,
    };
    let mut controller = Controller::new(QueueSource { frames }, client, settings());

    let t0 = Instant::now();
    for i in 0..10u64 {
        let report = controller.run_cycle(t0 + Duration::from_millis(i * 100))?;
        assert_eq!(
            report.dispatch,
            Some((Command::Raise, DispatchOutcome::Failed))
        );
    }

    // Failures leave the gate open, so every cycle attempted a dispatch.
    assert_eq!(calls.borrow().len(), 10);
    Ok(())
}

#[test]
fn downscale_halves_the_effective_area() -> Result<()> {
    // 80x60 = 4800 px at full resolution, ~1200 px after downscale by 2.
    let frames = VecDeque::from(vec![frame_with_patch(RED, 80, 60)]);
    let calls = Rc::new(RefCell::new(Vec::new()));
    let client = RecordingClient {
        calls: calls.clone(),
        succeed: true,
    };
    let mut settings = settings();
    settings.downscale = 2;
    let mut controller = Controller::new(QueueSource { frames }, client, settings);

    let report = controller.run_cycle(Instant::now())?;
    assert!(report.detections.red);
    assert_eq!(calls.borrow().len(), 1);
    Ok(())
}
