//! # Scene Kernel
//!
//! A small object-management kernel for real-time games: a rooted tree of
//! stateful nodes, a tag index over them, deferred structural mutation and a
//! fixed-step update / variable-step draw loop.
//!
//! ## Features
//!
//! - **Stable identities**: integer node ids from a configurable, wrapping range
//! - **Tag queries**: union and ordered-intersection lookups across tags
//! - **Safe mutation**: add/remove/move requests are queued and applied between passes
//! - **Two-phase loop**: fixed-step updates with catch-up clamping, per-camera draws
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_kernel::prelude::*;
//!
//! struct Spinner {
//!     angle: f64,
//! }
//!
//! impl Behavior for Spinner {
//!     fn capabilities(&self) -> Capabilities {
//!         Capabilities::UPDATE
//!     }
//!
//!     fn update(&mut self, _ctx: &mut NodeContext<'_>, time: &TimeStep) {
//!         self.angle += time.delta;
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut game = GameLoop::new(SchedulerConfig::default())?;
//!     let root = game.scene().root();
//!     let _spinner = game.scene_mut().add(Node::new(Spinner { angle: 0.0 }).with_tag("spinner"), root);
//!     game.start();
//!     game.run();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod engine;
pub mod foundation;
pub mod input;
pub mod render;
pub mod scene;

pub use engine::{GameLoop, LoopError, LoopState, TickReport};

/// Common imports for kernel users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, IdRange, SchedulerConfig},
        engine::{
            stepper::{IntervalStepper, StepScheduler, StepToken},
            GameLoop, LoopError, LoopState, TickReport,
        },
        foundation::time::{Clock, TimeStep},
        input::{BoundController, ControlContext, InputController, InputDevice, KeyCode},
        render::{Camera, NodeView, CAMERA_TAG},
        scene::{
            AddTicket, Behavior, Capabilities, DrawReport, MutationError, MutationReport, Node,
            NodeContext, NodeFlags, NodeId, ParentRef, Pending, QueryMode, Scene, ROOT_ID,
        },
    };
}
