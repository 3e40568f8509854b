//! Camera contract
//!
//! A camera is a rendering sink driven by the draw phase. The kernel never
//! touches pixels: it only tells each camera when to clear, when to compute
//! its view, how to nest state, and which node to draw next.

use crate::foundation::time::TimeStep;
use crate::scene::{Behavior, NodeView};

/// Tag that marks a node as a camera for discovery by the draw phase
pub const CAMERA_TAG: &str = "camera";

/// Upcast helper so default [`Camera`] methods can pass `self` as `&mut dyn Camera`
pub trait AsDynCamera {
    /// View this camera as a trait object
    fn as_dyn_camera(&mut self) -> &mut dyn Camera;
}

impl<T: Camera> AsDynCamera for T {
    fn as_dyn_camera(&mut self) -> &mut dyn Camera {
        self
    }
}

/// Rendering sink consumed by the draw phase
///
/// Call order for one camera in one tick:
/// `clear`, `calculate_view`, then for each drawn node `save_state`,
/// `draw_object` (and `debug_draw_object` when enabled), the node's drawn
/// descendants, `restore_state`. `draw_double_buffer` runs once after every
/// camera has finished.
pub trait Camera: AsDynCamera {
    /// Skip this camera entirely for the current tick
    fn is_disabled(&self) -> bool {
        false
    }

    /// Clear the camera's surface
    fn clear(&mut self);

    /// Recompute view parameters for this tick
    fn calculate_view(&mut self, time: &TimeStep);

    /// Push the current drawing state
    fn save_state(&mut self);

    /// Pop back to the last saved drawing state
    fn restore_state(&mut self);

    /// Gate consulted before each node is drawn
    fn allow_draw(&self, _node: &NodeView<'_>) -> bool {
        true
    }

    /// Draw one node
    ///
    /// The default hands the camera straight to [`Behavior::draw`]; cameras
    /// that position objects override this and call it themselves.
    fn draw_object(&mut self, node: &mut dyn Behavior, _view: &NodeView<'_>, time: &TimeStep) {
        node.draw(self.as_dyn_camera(), time);
    }

    /// Draw one node's debug overlay
    fn debug_draw_object(&mut self, node: &mut dyn Behavior, _view: &NodeView<'_>, time: &TimeStep) {
        node.debug_draw(self.as_dyn_camera(), time);
    }

    /// Whether [`Camera::draw_double_buffer`] should be called after drawing
    fn has_double_buffer(&self) -> bool {
        false
    }

    /// Present the back buffer
    fn draw_double_buffer(&mut self) {}
}
