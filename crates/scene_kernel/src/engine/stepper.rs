//! Step primitive
//!
//! The loop never sleeps on its own: it asks a [`StepScheduler`] for the next
//! step and blocks on it. Hosts with their own frame callback (a windowing
//! event loop, a display-refresh signal) implement the trait themselves;
//! [`IntervalStepper`] is the fallback that paces steps with a fixed interval.

use std::thread;
use std::time::{Duration, Instant};

/// Handle to one requested step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepToken(pub u64);

/// Source of "run the next tick now" signals
pub trait StepScheduler {
    /// Request one future step
    fn request(&mut self) -> StepToken;

    /// Cancel a requested step that has not fired yet
    fn cancel(&mut self, token: StepToken);

    /// Block until the step fires and return the wall time in seconds
    ///
    /// Returns `None` if the token was cancelled or never requested.
    fn wait(&mut self, token: StepToken) -> Option<f64>;
}

/// Paces steps at a fixed frame rate by sleeping
#[derive(Debug)]
pub struct IntervalStepper {
    origin: Instant,
    interval: Duration,
    last_fire: Option<Instant>,
    pending: Option<StepToken>,
    next_token: u64,
}

impl IntervalStepper {
    /// Create a stepper firing at most `frame_rate` times per second
    ///
    /// Non-positive or non-finite rates fire without waiting.
    pub fn new(frame_rate: f64) -> Self {
        let interval = if frame_rate.is_finite() && frame_rate > 0.0 {
            Duration::from_secs_f64(1.0 / frame_rate)
        } else {
            Duration::ZERO
        };
        Self {
            origin: Instant::now(),
            interval,
            last_fire: None,
            pending: None,
            next_token: 0,
        }
    }

    /// Minimum time between two steps
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check whether a step is waiting to fire
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl StepScheduler for IntervalStepper {
    fn request(&mut self) -> StepToken {
        let token = StepToken(self.next_token);
        self.next_token += 1;
        if let Some(previous) = self.pending.replace(token) {
            log::trace!("Step {} superseded by {}", previous.0, token.0);
        }
        token
    }

    fn cancel(&mut self, token: StepToken) {
        if self.pending == Some(token) {
            self.pending = None;
        }
    }

    fn wait(&mut self, token: StepToken) -> Option<f64> {
        if self.pending != Some(token) {
            return None;
        }
        self.pending = None;

        if let Some(last) = self.last_fire {
            let due = last + self.interval;
            let now = Instant::now();
            if due > now {
                thread::sleep(due - now);
            }
        }
        let fired = Instant::now();
        self.last_fire = Some(fired);
        Some(fired.duration_since(self.origin).as_secs_f64())
    }
}
