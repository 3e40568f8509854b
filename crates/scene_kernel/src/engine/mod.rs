//! Core loop implementation
//!
//! [`GameLoop`] ties the scene, the clock, input controllers and a step
//! primitive together. One tick is:
//!
//! 1. poll controllers
//! 2. run one update traversal per due fixed step, applying queued mutations
//!    after each
//! 3. apply queued mutations once more
//! 4. draw through every enabled camera

pub mod stepper;

use thiserror::Error;

use crate::config::{Config, ConfigError, SchedulerConfig};
use crate::foundation::time::Clock;
use crate::input::{ControlContext, InputController};
use crate::scene::{DrawReport, MutationReport, Scene};
use stepper::{IntervalStepper, StepScheduler, StepToken};

/// Running state of the loop
///
/// Pausing is orthogonal: a paused loop is still running and still draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No step is scheduled
    Stopped,
    /// A step is scheduled or being processed
    Running,
}

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Fixed update steps run
    pub steps: u32,
    /// Node updates, summed over steps
    pub updated: usize,
    /// Structural changes applied during the tick
    pub mutations: MutationReport,
    /// Draw phase counters
    pub draw: DrawReport,
}

/// Loop construction errors
#[derive(Error, Debug)]
pub enum LoopError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Main loop
///
/// Owns the scene and drives it with a fixed-step update phase and a
/// once-per-tick draw phase.
pub struct GameLoop {
    scene: Scene,
    clock: Clock,
    controllers: Vec<Box<dyn InputController>>,
    stepper: Box<dyn StepScheduler>,
    state: LoopState,
    pending_step: Option<StepToken>,
    debug_draw: bool,
}

impl GameLoop {
    /// Create a loop paced by an [`IntervalStepper`] at the configured frame rate
    pub fn new(config: SchedulerConfig) -> Result<Self, LoopError> {
        let stepper = IntervalStepper::new(config.frame_rate);
        Self::with_stepper(config, stepper)
    }

    /// Create a loop paced by a custom step primitive
    pub fn with_stepper(config: SchedulerConfig, stepper: impl StepScheduler + 'static) -> Result<Self, LoopError> {
        config.validate()?;
        log::debug!("Creating game loop with {config:?}");

        Ok(Self {
            scene: Scene::new(config.id_range),
            clock: Clock::from_config(&config),
            controllers: Vec::new(),
            stepper: Box::new(stepper),
            state: LoopState::Stopped,
            pending_step: None,
            debug_draw: config.debug_draw,
        })
    }

    /// Create a loop from a `.toml` or `.ron` configuration file
    pub fn from_config_file(path: &str) -> Result<Self, LoopError> {
        let config = SchedulerConfig::load_from_file(path)?;
        Self::new(config)
    }

    /// Get the scene
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Get mutable access to the scene
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Get the clock
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Get mutable access to the clock
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    /// Register a controller; controllers are polled in registration order
    pub fn add_controller(&mut self, controller: impl InputController + 'static) {
        self.controllers.push(Box::new(controller));
    }

    /// Current running state
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Check whether the loop is running
    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Enable or disable debug drawing
    pub fn set_debug_draw(&mut self, enabled: bool) {
        self.debug_draw = enabled;
    }

    /// Start the loop by requesting the first step
    ///
    /// Wall time spent stopped is not replayed as catch-up updates.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        log::info!("Starting game loop");
        self.state = LoopState::Running;
        self.clock.reset_wall_time();
        self.pending_step = Some(self.stepper.request());
    }

    /// Stop the loop by cancelling the pending step
    ///
    /// A tick already in progress runs to completion.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        log::info!("Stopping game loop after {} ticks", self.clock.tick_count());
        self.state = LoopState::Stopped;
        if let Some(token) = self.pending_step.take() {
            self.stepper.cancel(token);
        }
    }

    /// Pause the update phase; drawing continues
    pub fn pause(&mut self) {
        self.clock.pause();
    }

    /// Resume the update phase
    pub fn resume(&mut self) {
        self.clock.resume();
    }

    /// Check whether updates are paused
    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    /// Set the time scale applied to update and draw deltas
    pub fn set_time_scale(&mut self, scale: f64) {
        self.clock.set_time_scale(scale);
    }

    /// Run ticks until the loop stops or the step primitive stops firing
    pub fn run(&mut self) {
        while let Some(token) = self.pending_step {
            let Some(now) = self.stepper.wait(token) else {
                log::debug!("Step primitive stopped firing");
                self.pending_step = None;
                self.stop();
                break;
            };
            self.pending_step = None;
            self.tick(now);
            if self.is_running() {
                self.pending_step = Some(self.stepper.request());
            }
        }
    }

    /// Run one tick from a host-owned frame callback
    ///
    /// Does nothing unless the loop is running with a step pending. Returns
    /// whether a tick ran.
    pub fn frame(&mut self, now: f64) -> bool {
        let Some(token) = self.pending_step.take() else {
            return false;
        };
        self.stepper.cancel(token);
        self.tick(now);
        if self.is_running() {
            self.pending_step = Some(self.stepper.request());
        }
        true
    }

    /// Process one tick at wall time `now` (seconds)
    pub fn tick(&mut self, now: f64) -> TickReport {
        let elapsed = self.clock.begin_tick(now);
        let mut report = TickReport::default();

        let mut stop_requested = false;
        for controller in &mut self.controllers {
            let mut ctx = ControlContext::new(&mut self.scene, &mut self.clock);
            controller.update(&mut ctx);
            stop_requested |= ctx.stop_requested();
        }

        report.steps = self.clock.accumulate(elapsed);
        for _ in 0..report.steps {
            let time = self.clock.next_update();
            report.updated += self.scene.update(&time);
            report.mutations.merge(self.scene.apply_mutations());
        }
        report.mutations.merge(self.scene.apply_mutations());

        let frame_time = self.clock.frame_time(elapsed);
        report.draw = self.scene.draw(&frame_time, self.debug_draw);

        log::trace!("Tick {}: {report:?}", self.clock.tick_count());
        if stop_requested {
            log::debug!("Controller requested stop");
            self.stop();
        }
        report
    }
}

impl std::fmt::Debug for GameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameLoop")
            .field("state", &self.state)
            .field("scene", &self.scene)
            .field("clock", &self.clock)
            .field("controllers", &self.controllers.len())
            .field("pending_step", &self.pending_step)
            .finish_non_exhaustive()
    }
}
