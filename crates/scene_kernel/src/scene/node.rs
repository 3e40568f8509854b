//! Node model
//!
//! A [`Node`] is the unattached form of a tree member: a behavior plus the
//! initial tags, flags and children it should be attached with. Once attached
//! the node lives in the [`Scene`] arena and is addressed only by [`NodeId`].
//!
//! Behaviors declare which optional callbacks they implement through
//! [`Capabilities`], so the scheduler can skip absent ones (and, for drawing,
//! avoid bracketing nodes that never draw).

use std::collections::BTreeSet;
use std::fmt;

use bitflags::bitflags;

use crate::foundation::time::TimeStep;
use crate::render::Camera;
use crate::scene::{NodeId, ParentRef, Pending, Scene};

bitflags! {
    /// Optional callbacks a behavior implements
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// [`Behavior::update`] is called during the update traversal
        const UPDATE = 1 << 0;
        /// [`Behavior::draw`] is called during the draw traversal
        const DRAW = 1 << 1;
        /// [`Behavior::debug_draw`] is called when debug drawing is enabled
        const DEBUG_DRAW = 1 << 2;
        /// [`Behavior::sort_children`] reorders children per camera
        const CHILD_SORT = 1 << 3;
    }
}

bitflags! {
    /// Per-node traversal flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Skip this node's descendants during the update traversal
        const SUPPRESS_CHILD_UPDATES = 1 << 0;
        /// Skip this node's descendants during the draw traversal
        const SUPPRESS_CHILD_DRAWS = 1 << 1;
    }
}

/// Behavior attached to a node
///
/// Every method has a no-op default. Callbacks guarded by a capability only
/// run when [`Behavior::capabilities`] reports it.
pub trait Behavior: 'static {
    /// Callbacks this behavior implements
    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    /// Tags every node with this behavior carries
    fn class_tags(&self) -> &'static [&'static str] {
        &[]
    }

    /// Advance the node by one fixed step
    fn update(&mut self, _ctx: &mut NodeContext<'_>, _time: &TimeStep) {}

    /// Draw the node through a camera
    fn draw(&mut self, _camera: &mut dyn Camera, _time: &TimeStep) {}

    /// Draw debug overlays through a camera
    fn debug_draw(&mut self, _camera: &mut dyn Camera, _time: &TimeStep) {}

    /// Order in which children are drawn for this camera
    fn sort_children(&mut self, _camera: &dyn Camera, children: Vec<NodeId>) -> Vec<NodeId> {
        children
    }

    /// Called once the node's whole added subtree is attached
    fn on_attached(&mut self, _ctx: &mut NodeContext<'_>) {}

    /// Called after the node's whole removed subtree is detached
    ///
    /// The node is no longer part of the scene when this runs.
    fn on_detached(&mut self, _ctx: &mut NodeContext<'_>) {}

    /// Called after the node was reparented
    fn on_moved(&mut self, _ctx: &mut NodeContext<'_>, _old_parent: NodeId, _new_parent: NodeId) {}

    /// Camera interface, for behaviors that render the tree
    ///
    /// Camera nodes must also carry [`crate::render::CAMERA_TAG`] to be discovered.
    fn as_camera(&mut self) -> Option<&mut dyn Camera> {
        None
    }
}

/// A node that has not been attached yet
pub struct Node {
    pub(crate) id: Option<NodeId>,
    pub(crate) behavior: Option<Box<dyn Behavior>>,
    pub(crate) tags: Vec<String>,
    pub(crate) flags: NodeFlags,
    pub(crate) children: Vec<Node>,
}

impl Node {
    /// Create a node driven by a behavior
    pub fn new(behavior: impl Behavior) -> Self {
        Self::from_boxed(Box::new(behavior))
    }

    /// Create a node from an already boxed behavior
    pub fn from_boxed(behavior: Box<dyn Behavior>) -> Self {
        Self {
            id: None,
            behavior: Some(behavior),
            tags: Vec::new(),
            flags: NodeFlags::empty(),
            children: Vec::new(),
        }
    }

    /// Create a node with no behavior, useful for grouping
    pub fn group() -> Self {
        Self {
            id: None,
            behavior: None,
            tags: Vec::new(),
            flags: NodeFlags::empty(),
            children: Vec::new(),
        }
    }

    /// Attach with a caller-chosen identity instead of an allocated one
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    /// Add an instance tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add several instance tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Set traversal flags
    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Declare a child attached together with this node
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Declare several children attached together with this node
    pub fn with_children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    /// Identity chosen by the caller, if any
    pub fn id(&self) -> Option<NodeId> {
        self.id
    }

    /// Number of nodes in this declared subtree, itself included
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Self::subtree_len).sum::<usize>()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("has_behavior", &self.behavior.is_some())
            .field("tags", &self.tags)
            .field("flags", &self.flags)
            .field("children", &self.children)
            .finish()
    }
}

/// Read-only view of an attached node
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    /// Node identity
    pub id: NodeId,
    /// Parent identity, `None` for the root
    pub parent: Option<NodeId>,
    /// Current tag set
    pub tags: &'a BTreeSet<String>,
    /// Traversal flags
    pub flags: NodeFlags,
}

impl NodeView<'_> {
    /// Check whether the node carries a tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Access to the scene from inside node callbacks
///
/// Structural requests made here are queued and applied at the next mutation
/// point, so they are safe while a traversal is running.
pub struct NodeContext<'a> {
    id: NodeId,
    scene: &'a mut Scene,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(id: NodeId, scene: &'a mut Scene) -> Self {
        Self { id, scene }
    }

    /// Identity of the node being called
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Parent of the node being called, if it is attached
    pub fn parent(&self) -> Option<NodeId> {
        self.scene.parent(self.id)
    }

    /// The scene, read-only
    ///
    /// Structural changes go through the queueing methods on this context.
    pub fn scene(&self) -> &Scene {
        &*self.scene
    }

    /// Queue an add under any parent
    pub fn add(&mut self, node: Node, parent: impl Into<ParentRef>) -> Pending<NodeId> {
        self.scene.add(node, parent)
    }

    /// Queue a child under this node
    pub fn add_child(&mut self, node: Node) -> Pending<NodeId> {
        self.scene.add(node, ParentRef::Node(self.id))
    }

    /// Queue removal of any node and its subtree
    pub fn remove(&mut self, id: NodeId) -> Pending<()> {
        self.scene.remove(id)
    }

    /// Queue removal of this node and its subtree
    pub fn remove_self(&mut self) -> Pending<()> {
        self.scene.remove(self.id)
    }

    /// Queue a move of any node
    pub fn move_to(&mut self, id: NodeId, new_parent: NodeId) -> Pending<()> {
        self.scene.move_to(id, new_parent)
    }

    /// Add instance tags to this node
    pub fn add_tags<S: AsRef<str>>(&mut self, tags: &[S]) -> bool {
        self.scene.add_tags(self.id, tags)
    }

    /// Remove tags from this node
    pub fn remove_tags<S: AsRef<str>>(&mut self, tags: &[S]) -> bool {
        self.scene.remove_tags(self.id, tags)
    }

    /// Replace this node's traversal flags
    pub fn set_flags(&mut self, flags: NodeFlags) {
        self.scene.set_flags(self.id, flags);
    }
}

impl fmt::Debug for NodeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeContext").field("id", &self.id).finish_non_exhaustive()
    }
}
