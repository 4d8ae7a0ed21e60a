//! Command rate limiting.
//!
//! `CommandGate` enforces a minimum interval between successfully dispatched
//! commands. The gate has two logical states, evaluated lazily from the
//! caller-supplied clock: COOLING (a recent success, new sends rejected) and
//! READY (send attempts permitted). COOLING becomes READY purely by elapsed
//! time; READY becomes COOLING only on a confirmed dispatch success.
//!
//! A failed attempt leaves the gate unchanged, so the next attempt is
//! governed only by the last *successful* dispatch. Failures never extend
//! the lockout.

use std::time::{Duration, Instant};

use crate::actuator::{ActuatorClient, Command};

/// Outcome of one dispatch attempt through the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Actuator confirmed the command; gate is now cooling.
    Sent,
    /// Cooldown active; actuator was not contacted.
    Throttled,
    /// Actuator was contacted and reported failure; gate unchanged.
    Failed,
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchOutcome::Sent)
    }
}

/// Stateful gate in front of the actuator client.
///
/// The clock is passed into every call, so tests drive the gate with a
/// synthetic timeline instead of waiting out real cooldowns.
pub struct CommandGate {
    cooldown: Duration,
    last_success: Option<Instant>,
}

impl CommandGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_success: None,
        }
    }

    /// True when a send attempt would be permitted at `now`.
    pub fn is_ready(&self, now: Instant) -> bool {
        match self.last_success {
            None => true,
            Some(at) => now.duration_since(at) >= self.cooldown,
        }
    }

    /// Attempt one command dispatch through `client`.
    ///
    /// Under cooldown the client is not contacted at all. Only a confirmed
    /// success updates the gate timestamp.
    pub fn try_dispatch<C: ActuatorClient>(
        &mut self,
        client: &mut C,
        command: Command,
        now: Instant,
    ) -> DispatchOutcome {
        if !self.is_ready(now) {
            return DispatchOutcome::Throttled;
        }
        if client.send(command) {
            self.last_success = Some(now);
            DispatchOutcome::Sent
        } else {
            DispatchOutcome::Failed
        }
    }
}
