//! Per-frame orchestration.
//!
//! The controller runs the perception-to-action cycle: fetch the freshest
//! frame, segment, detect, and dispatch a single command when a class is
//! present and the gate allows. It owns no cross-frame state of its own;
//! everything that persists between iterations lives in the command gate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::actuator::{ActuatorClient, Command};
use crate::capture::FrameSource;
use crate::detect::{detect_classes, Detections};
use crate::preview::PreviewSink;
use crate::segment::{segment, ColorClass, ColorRange};
use crate::throttle::{CommandGate, DispatchOutcome};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Loop parameters fixed at startup.
#[derive(Clone, Debug)]
pub struct ControllerSettings {
    /// Minimum interval between successfully dispatched commands.
    pub cooldown: Duration,
    /// Color table in dispatch priority order.
    pub colors: Vec<(ColorClass, ColorRange)>,
    /// Minimum region area, against the downscaled resolution.
    pub min_area: usize,
    /// Integer downscale factor applied before segmentation (1 = off).
    pub downscale: u32,
}

/// What one cycle saw and did.
#[derive(Clone, Copy, Debug)]
pub struct CycleReport {
    pub detections: Detections,
    pub dispatch: Option<(Command, DispatchOutcome)>,
}

/// The control loop, generic over its collaborators so tests can inject a
/// synthetic source and a fake actuator.
pub struct Controller<S: FrameSource, C: ActuatorClient> {
    source: S,
    client: C,
    gate: CommandGate,
    settings: ControllerSettings,
    preview: Option<PreviewSink>,
    cycles: u64,
}

impl<S: FrameSource, C: ActuatorClient> Controller<S, C> {
    pub fn new(source: S, client: C, settings: ControllerSettings) -> Self {
        let gate = CommandGate::new(settings.cooldown);
        Self {
            source,
            client,
            gate,
            settings,
            preview: None,
            cycles: 0,
        }
    }

    pub fn with_preview(mut self, sink: PreviewSink) -> Self {
        self.preview = Some(sink);
        self
    }

    /// Run one perception-to-action cycle at `now`.
    ///
    /// Acquisition failure is terminal and propagates; everything after it
    /// is recovered locally. At most one dispatch attempt happens per
    /// cycle, and red takes priority when both classes are detected.
    pub fn run_cycle(&mut self, now: Instant) -> Result<CycleReport> {
        let frame = self.source.next_frame()?;
        let processed = frame.downscale(self.settings.downscale)?;

        let masks = segment(&processed, &self.settings.colors);
        let detections = detect_classes(&masks, self.settings.min_area);

        let command = if detections.red {
            Some(Command::Raise)
        } else if detections.blue {
            Some(Command::Lower)
        } else {
            None
        };

        let dispatch =
            command.map(|command| (command, self.gate.try_dispatch(&mut self.client, command, now)));

        if let Some(sink) = &mut self.preview {
            if let Err(err) = sink.render(&processed, now) {
                log::warn!("preview write failed: {}", err);
            }
        }

        self.cycles += 1;
        Ok(CycleReport {
            detections,
            dispatch,
        })
    }

    /// Run cycles until the stop flag is set or acquisition fails.
    ///
    /// The stop flag is checked once per iteration; cancellation is
    /// cooperative and cannot abort a blocked read or request mid-flight.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<()> {
        let mut last_health_log = Instant::now();

        while !stop.load(Ordering::Relaxed) {
            let report = self.run_cycle(Instant::now())?;
            log_report(&report);

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                log::info!(
                    "controller: {} cycles completed, source healthy={}",
                    self.cycles,
                    self.source.is_healthy()
                );
                last_health_log = Instant::now();
            }
        }

        log::info!("stop requested, leaving control loop");
        Ok(())
    }
}

fn log_report(report: &CycleReport) {
    let Some((command, outcome)) = report.dispatch else {
        return;
    };
    let class = if report.detections.red { "red" } else { "blue" };
    match outcome {
        DispatchOutcome::Sent => {
            log::info!("{} detected, sent '{}'", class, command.wire_name());
        }
        DispatchOutcome::Failed => {
            log::warn!("{} detected, dispatch '{}' failed", class, command.wire_name());
        }
        DispatchOutcome::Throttled => {
            log::debug!("{} detected, '{}' throttled", class, command.wire_name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use anyhow::anyhow;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    const RED: [u8; 3] = [200, 16, 16];
    const BLUE: [u8; 3] = [16, 16, 200];
    const GRAY: [u8; 3] = [96, 96, 96];

    /// 32x32 gray frame with an optional colored square of the given side.
    fn scene(patch: Option<([u8; 3], u32)>) -> Frame {
        let mut data = Vec::with_capacity(32 * 32 * 3);
        for y in 0..32u32 {
            for x in 0..32u32 {
                let rgb = match patch {
                    Some((rgb, side)) if x < side && y < side => rgb,
                    _ => GRAY,
                };
                data.extend_from_slice(&rgb);
            }
        }
        Frame::from_rgb(data, 32, 32).unwrap()
    }

    /// Frame with both a red and a blue patch.
    fn scene_both() -> Frame {
        let mut data = Vec::with_capacity(32 * 32 * 3);
        for y in 0..32u32 {
            for x in 0..32u32 {
                let rgb = if x < 8 && y < 8 {
                    RED
                } else if x >= 24 && y >= 24 {
                    BLUE
                } else {
                    GRAY
                };
                data.extend_from_slice(&rgb);
            }
        }
        Frame::from_rgb(data, 32, 32).unwrap()
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

    impl RecordingClient {
        fn new(succeed: bool) -> (Self, Rc<RefCell<Vec<Command>>>) {
            let calls = Rc::new(RefCell::new(Vec::new()));
            (
                Self {
                    calls: calls.clone(),
                    succeed,
                },
                calls,
            )
        }
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
                (
                    ColorClass::Red,
                    ColorRange::new([0, 120, 70], [10, 255, 255]).unwrap(),
                ),
                (
                    ColorClass::Blue,
                    ColorRange::new([100, 150, 50], [130, 255, 255]).unwrap(),
                ),
            ],
            min_area: 16,
            downscale: 1,
        }
    }

    fn controller(
        frames: Vec<Frame>,
        succeed: bool,
    ) -> (
        Controller<QueueSource, RecordingClient>,
        Rc<RefCell<Vec<Command>>>,
    ) {
        let (client, calls) = RecordingClient::new(succeed);
        let source = QueueSource {
            frames: frames.into(),
        };
        (Controller::new(source, client, settings()), calls)
    }

    #[test]
    fn frame_without_tracked_colors_attempts_nothing() -> Result<()> {
        let (mut controller, calls) = controller(vec![scene(None)], true);

        let report = controller.run_cycle(Instant::now())?;

        assert!(!report.detections.red);
        assert!(!report.detections.blue);
        assert!(report.dispatch.is_none());
        assert!(calls.borrow().is_empty());
        Ok(())
    }

    #[test]
    fn red_detection_dispatches_raise() -> Result<()> {
        let (mut controller, calls) = controller(vec![scene(Some((RED, 8)))], true);

        let report = controller.run_cycle(Instant::now())?;

        assert!(report.detections.red);
        assert_eq!(
            report.dispatch,
            Some((Command::Raise, DispatchOutcome::Sent))
        );
        assert_eq!(*calls.borrow(), vec![Command::Raise]);
        Ok(())
    }

    #[test]
    fn blue_detection_dispatches_lower() -> Result<()> {
        let (mut controller, calls) = controller(vec![scene(Some((BLUE, 8)))], true);

        let report = controller.run_cycle(Instant::now())?;

        assert!(report.detections.blue);
        assert_eq!(
            report.dispatch,
            Some((Command::Lower, DispatchOutcome::Sent))
        );
        assert_eq!(*calls.borrow(), vec![Command::Lower]);
        Ok(())
    }

    #[test]
    fn red_takes_priority_when_both_are_detected() -> Result<()> {
        let (mut controller, calls) = controller(vec![scene_both()], true);

        let report = controller.run_cycle(Instant::now())?;

        assert!(report.detections.red);
        assert!(report.detections.blue);
        assert_eq!(
            report.dispatch,
            Some((Command::Raise, DispatchOutcome::Sent))
        );
        // Exactly one attempt per cycle.
        assert_eq!(*calls.borrow(), vec![Command::Raise]);
        Ok(())
    }

    #[test]
    fn patch_below_min_area_is_not_detected() -> Result<()> {
        // 3x3 patch, min_area 16.
        let (mut controller, calls) = controller(vec![scene(Some((RED, 3)))], true);

        let report = controller.run_cycle(Instant::now())?;

        assert!(!report.detections.red);
        assert!(report.dispatch.is_none());
        assert!(calls.borrow().is_empty());
        Ok(())
    }

    #[test]
    fn unreachable_actuator_never_stops_the_loop() -> Result<()> {
        let frames = vec![scene(Some((RED, 8))); 5];
        let (mut controller, calls) = controller(frames, false);

        let t0 = Instant::now();
        for i in 0..5u64 {
            let report = controller.run_cycle(t0 + Duration::from_millis(i * 2_000))?;
            assert_eq!(
                report.dispatch,
                Some((Command::Raise, DispatchOutcome::Failed))
            );
        }
        // Every attempt reached the actuator; failures never extend the
        // lockout.
        assert_eq!(calls.borrow().len(), 5);
        Ok(())
    }

    #[test]
    fn acquisition_failure_is_terminal() {
        let (mut controller, _calls) = controller(vec![], true);
        assert!(controller.run_cycle(Instant::now()).is_err());
    }

    #[test]
    fn run_respects_a_preset_stop_flag() -> Result<()> {
        // An exhausted source would fail the first cycle, proving the flag
        // is checked before acquisition.
        let (mut controller, _calls) = controller(vec![], true);
        let stop = AtomicBool::new(true);

        controller.run(&stop)
    }
}
