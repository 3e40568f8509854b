//! Input controllers
//!
//! Controllers run once per tick, before the update phase. They receive a
//! [`ControlContext`] with the scene, the clock and a stop switch, which is
//! enough to translate device input into game commands.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::foundation::time::Clock;
use crate::scene::Scene;

/// Per-tick access handed to input controllers
pub struct ControlContext<'a> {
    scene: &'a mut Scene,
    clock: &'a mut Clock,
    stop_requested: bool,
}

impl<'a> ControlContext<'a> {
    pub(crate) fn new(scene: &'a mut Scene, clock: &'a mut Clock) -> Self {
        Self {
            scene,
            clock,
            stop_requested: false,
        }
    }

    /// The scene
    ///
    /// Controllers run between passes, so structural requests made here are
    /// applied within the same tick.
    pub fn scene(&mut self) -> &mut Scene {
        &mut *self.scene
    }

    /// The clock, for pausing or rescaling time
    pub fn clock(&mut self) -> &mut Clock {
        &mut *self.clock
    }

    /// Ask the loop to stop once this tick finishes
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    /// Check whether a stop has been requested this tick
    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }
}

impl fmt::Debug for ControlContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlContext")
            .field("stop_requested", &self.stop_requested)
            .finish_non_exhaustive()
    }
}

/// Something polled once per tick before the update phase
pub trait InputController {
    /// Poll input and act on it
    fn update(&mut self, ctx: &mut ControlContext<'_>);
}

impl<F> InputController for F
where
    F: FnMut(&mut ControlContext<'_>),
{
    fn update(&mut self, ctx: &mut ControlContext<'_>) {
        self(ctx);
    }
}

/// Source of abstract actions, such as a keyboard or a gamepad
pub trait InputDevice<A> {
    /// Drain the actions that fired since the last poll, oldest first
    fn poll(&mut self) -> Vec<A>;
}

type Command = Box<dyn FnMut(&mut ControlContext<'_>)>;

/// Controller that maps device actions to bound commands
///
/// Actions without a binding are ignored.
pub struct BoundController<A, D> {
    device: D,
    bindings: HashMap<A, Command>,
}

impl<A, D> BoundController<A, D>
where
    A: Eq + Hash + fmt::Debug,
    D: InputDevice<A>,
{
    /// Create a controller with no bindings
    pub fn new(device: D) -> Self {
        Self {
            device,
            bindings: HashMap::new(),
        }
    }

    /// Bind a command to an action, replacing any previous binding
    pub fn bind(mut self, action: A, command: impl FnMut(&mut ControlContext<'_>) + 'static) -> Self {
        self.bindings.insert(action, Box::new(command));
        self
    }

    /// Remove the binding of an action
    pub fn unbind(&mut self, action: &A) -> bool {
        self.bindings.remove(action).is_some()
    }

    /// Check whether an action has a binding
    pub fn is_bound(&self, action: &A) -> bool {
        self.bindings.contains_key(action)
    }

    /// The wrapped device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable access to the wrapped device
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<A, D> InputController for BoundController<A, D>
where
    A: Eq + Hash + fmt::Debug,
    D: InputDevice<A>,
{
    fn update(&mut self, ctx: &mut ControlContext<'_>) {
        for action in self.device.poll() {
            match self.bindings.get_mut(&action) {
                Some(command) => command(ctx),
                None => log::trace!("No command bound to {action:?}"),
            }
        }
    }
}

impl<A: fmt::Debug, D> fmt::Debug for BoundController<A, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundController")
            .field("bound", &self.bindings.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A key
    A,
    /// D key
    D,
    /// P key
    P,
    /// S key
    S,
    /// W key
    W,
    /// Space key
    Space,
    /// Enter key
    Enter,
    /// Escape key
    Escape,
    /// Up arrow
    Up,
    /// Down arrow
    Down,
    /// Left arrow
    Left,
    /// Right arrow
    Right,
}
