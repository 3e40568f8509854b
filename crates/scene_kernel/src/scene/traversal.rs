//! Update and draw traversals
//!
//! Both passes are depth-first and pre-order, driven by an explicit stack of
//! identities. Structural requests made by callbacks are only queued, and the
//! stack skips identities that are no longer attached, so nothing a callback
//! does can invalidate the pass in progress.

use crate::foundation::time::TimeStep;
use crate::render::{Camera, CAMERA_TAG};
use crate::scene::tree::NodeEntry;
use crate::scene::{Capabilities, NodeFlags, NodeId, NodeView, QueryMode, Scene, ROOT_ID};

enum DrawStep {
    Visit(NodeId),
    Restore,
}

/// Counters from one draw phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawReport {
    /// Cameras that rendered the tree
    pub cameras: usize,
    /// Nodes drawn, summed over cameras
    pub nodes: usize,
}

/// Restrict a custom child order to the actual children
///
/// Unknown and repeated identities are dropped; children the sort left out
/// follow in their stored order.
fn reconcile_order(children: &[NodeId], sorted: Vec<NodeId>) -> Vec<NodeId> {
    let mut order = Vec::with_capacity(children.len());
    for id in sorted {
        if children.contains(&id) && !order.contains(&id) {
            order.push(id);
        }
    }
    if order.len() < children.len() {
        let missing: Vec<NodeId> = children.iter().filter(|id| !order.contains(id)).copied().collect();
        order.extend(missing);
    }
    order
}

impl Scene {
    /// Run one update traversal and return how many nodes were updated
    ///
    /// A node flagged [`NodeFlags::SUPPRESS_CHILD_UPDATES`] is updated itself
    /// but its descendants are skipped. Flags are read after the node's own
    /// update, so a node can toggle suppression for the current pass.
    pub fn update(&mut self, time: &TimeStep) -> usize {
        let mut updated = 0;
        let mut stack = vec![ROOT_ID];

        while let Some(id) = stack.pop() {
            let Some(entry) = self.nodes.get(&id) else {
                continue;
            };
            let wants_update = entry
                .behavior
                .as_ref()
                .is_some_and(|behavior| behavior.capabilities().contains(Capabilities::UPDATE));

            if wants_update && self.with_behavior(id, |behavior, ctx| behavior.update(ctx, time)).is_some() {
                updated += 1;
            }

            if let Some(entry) = self.nodes.get(&id) {
                if !entry.flags.contains(NodeFlags::SUPPRESS_CHILD_UPDATES) {
                    stack.extend(entry.children.iter().rev().copied());
                }
            }
        }
        updated
    }

    /// Render the tree once per enabled camera
    ///
    /// Cameras are the attached nodes tagged [`CAMERA_TAG`] whose behavior
    /// exposes [`Camera`], visited in ascending identity order. Double buffers
    /// are flushed only after every camera has drawn.
    pub fn draw(&mut self, time: &TimeStep, debug: bool) -> DrawReport {
        let mut report = DrawReport::default();
        let mut rendered = Vec::new();

        for id in self.query(&[CAMERA_TAG], QueryMode::Inclusive) {
            let Some(mut behavior) = self.nodes.get_mut(&id).and_then(|entry| entry.behavior.take()) else {
                continue;
            };
            if let Some(camera) = behavior.as_camera() {
                if !camera.is_disabled() {
                    camera.clear();
                    camera.calculate_view(time);
                    report.nodes += self.draw_tree(camera, time, debug);
                    report.cameras += 1;
                    rendered.push(id);
                }
            }
            self.return_behavior(id, behavior);
        }

        for id in rendered {
            let Some(mut behavior) = self.nodes.get_mut(&id).and_then(|entry| entry.behavior.take()) else {
                continue;
            };
            if let Some(camera) = behavior.as_camera() {
                if camera.has_double_buffer() {
                    camera.draw_double_buffer();
                }
            }
            self.return_behavior(id, behavior);
        }

        report
    }

    fn return_behavior(&mut self, id: NodeId, behavior: Box<dyn crate::scene::Behavior>) {
        if let Some(entry) = self.nodes.get_mut(&id) {
            entry.behavior = Some(behavior);
        }
    }

    /// One camera's pass over the tree
    ///
    /// A drawn node is bracketed by `save_state` before it draws and
    /// `restore_state` after its last descendant, so descendants inherit the
    /// state the node set up.
    fn draw_tree(&mut self, camera: &mut dyn Camera, time: &TimeStep, debug: bool) -> usize {
        let mut drawn = 0;
        let mut stack = vec![DrawStep::Visit(ROOT_ID)];

        while let Some(step) = stack.pop() {
            let id = match step {
                DrawStep::Restore => {
                    camera.restore_state();
                    continue;
                }
                DrawStep::Visit(id) => id,
            };
            let Some(entry) = self.nodes.get_mut(&id) else {
                continue;
            };
            let NodeEntry {
                parent,
                children,
                tags,
                flags,
                behavior,
                ..
            } = entry;
            let view = NodeView {
                id,
                parent: *parent,
                tags: &*tags,
                flags: *flags,
            };
            let descend = !flags.contains(NodeFlags::SUPPRESS_CHILD_DRAWS);
            let mut order = None;

            if let Some(behavior) = behavior.as_deref_mut() {
                let caps = behavior.capabilities();
                let draws = caps.contains(Capabilities::DRAW);
                let debug_draws = debug && caps.contains(Capabilities::DEBUG_DRAW);

                if (draws || debug_draws) && camera.allow_draw(&view) {
                    camera.save_state();
                    if draws {
                        camera.draw_object(behavior, &view, time);
                    }
                    if debug_draws {
                        camera.debug_draw_object(behavior, &view, time);
                    }
                    stack.push(DrawStep::Restore);
                    drawn += 1;
                }

                if descend && caps.contains(Capabilities::CHILD_SORT) {
                    let sorted = behavior.sort_children(&*camera, children.clone());
                    order = Some(reconcile_order(children, sorted));
                }
            }

            if descend {
                let order = order.unwrap_or_else(|| children.clone());
                stack.extend(order.into_iter().rev().map(DrawStep::Visit));
            }
        }
        drawn
    }
}
