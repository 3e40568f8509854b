//! Time management utilities
//!
//! [`Clock`] owns the scheduler's notion of time: wall-clock bookkeeping,
//! the fixed-step accumulator, time scaling and the pause flag. Each update
//! and draw pass receives a [`TimeStep`] snapshot.

use crate::config::SchedulerConfig;

/// Time descriptor handed to update and draw callbacks
///
/// All values are in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeStep {
    /// Time-scaled delta for this pass (fixed for updates, wall elapsed for draws)
    pub delta: f64,
    /// Time scale in effect for this pass
    pub time_scale: f64,
    /// Monotonic animation clock, advanced only by update steps
    pub animation_time: f64,
    /// Wall time of the current tick
    pub now: f64,
    /// Wall time of the previous tick
    pub previous: f64,
}

/// Fixed-step clock driving the update phase
#[derive(Debug, Clone)]
pub struct Clock {
    step: f64,
    max_catch_up_steps: u32,
    time_scale: f64,
    paused: bool,
    accumulator: f64,
    animation_time: f64,
    now: f64,
    previous: f64,
    started: bool,
    tick_count: u64,
    update_count: u64,
}

impl Clock {
    /// Create a new clock
    ///
    /// # Arguments
    /// * `step` - Fixed update interval in seconds
    /// * `max_catch_up_steps` - Largest backlog, in whole steps, kept after a stall
    pub fn new(step: f64, max_catch_up_steps: u32) -> Self {
        Self {
            step,
            max_catch_up_steps,
            time_scale: 1.0,
            paused: false,
            accumulator: 0.0,
            animation_time: 0.0,
            now: 0.0,
            previous: 0.0,
            started: false,
            tick_count: 0,
            update_count: 0,
        }
    }

    /// Create a clock from scheduler configuration
    pub fn from_config(config: &SchedulerConfig) -> Self {
        let mut clock = Self::new(config.step_seconds, config.max_catch_up_steps);
        clock.time_scale = config.time_scale;
        clock.paused = config.start_paused;
        clock
    }

    /// Record the wall time of a new tick and return the elapsed wall time
    ///
    /// The first tick after construction (or [`Clock::reset_wall_time`]) reports
    /// zero elapsed time. Time running backwards is treated as no elapsed time.
    pub fn begin_tick(&mut self, now: f64) -> f64 {
        let elapsed = if self.started { (now - self.now).max(0.0) } else { 0.0 };
        self.previous = if self.started { self.now } else { now };
        self.now = now;
        self.started = true;
        self.tick_count += 1;
        elapsed
    }

    /// Forget the last wall time so the next tick starts fresh
    ///
    /// Used when the loop restarts after a stop, so the stopped interval is
    /// not replayed as a catch-up burst.
    pub fn reset_wall_time(&mut self) {
        self.started = false;
    }

    /// Add elapsed wall time to the accumulator and return how many fixed
    /// steps are due
    ///
    /// Returns zero while paused without touching the accumulator. A backlog
    /// larger than `max_catch_up_steps` steps is clamped and the remainder dropped.
    pub fn accumulate(&mut self, elapsed: f64) -> u32 {
        if self.paused {
            return 0;
        }

        self.accumulator += elapsed;

        let max_backlog = self.step * f64::from(self.max_catch_up_steps);
        if self.accumulator > max_backlog {
            log::warn!(
                "Update backlog of {:.3}s exceeds {} steps, dropping {:.3}s",
                self.accumulator,
                self.max_catch_up_steps,
                self.accumulator - max_backlog
            );
            self.accumulator = max_backlog;
        }

        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_catch_up_steps {
            self.accumulator -= self.step;
            steps += 1;
        }
        steps
    }

    /// Produce the time descriptor for one fixed update step
    ///
    /// Advances the animation clock by the time-scaled step.
    pub fn next_update(&mut self) -> TimeStep {
        let delta = self.step * self.time_scale;
        self.animation_time += delta;
        self.update_count += 1;
        TimeStep {
            delta,
            time_scale: self.time_scale,
            animation_time: self.animation_time,
            now: self.now,
            previous: self.previous,
        }
    }

    /// Produce the time descriptor for the draw phase of the current tick
    pub fn frame_time(&self, elapsed: f64) -> TimeStep {
        TimeStep {
            delta: elapsed * self.time_scale,
            time_scale: self.time_scale,
            animation_time: self.animation_time,
            now: self.now,
            previous: self.previous,
        }
    }

    /// Pause the update phase
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume the update phase
    ///
    /// Time that passed while paused is never replayed.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Check whether updates are paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Set the time scale; negative or non-finite values are clamped to zero
    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = if scale.is_finite() { scale.max(0.0) } else { 0.0 };
    }

    /// Get the current time scale
    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Get the fixed update interval in seconds
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Get the time currently waiting in the accumulator
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Get the animation clock
    pub fn animation_time(&self) -> f64 {
        self.animation_time
    }

    /// Get the wall time of the current tick
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Get the number of ticks processed
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Get the number of fixed update steps run
    pub fn update_count(&self) -> u64 {
        self.update_count
    }
}
