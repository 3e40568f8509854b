//! Node tree
//!
//! The tree is an arena keyed by [`NodeId`]: each entry stores its parent and
//! ordered children as identities, never as references. The root (identity 0)
//! is created with the scene and can be neither removed nor reparented.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::config::IdRange;
use crate::scene::identity::IdAllocator;
use crate::scene::mutation::MutationQueues;
use crate::scene::node::NodeContext;
use crate::scene::{
    Behavior, Node, NodeFlags, NodeId, NodeView, ParentRef, Pending, QueryMode, TagIndex, ROOT_ID,
};

/// Arena slot of an attached node
pub(crate) struct NodeEntry {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) tags: BTreeSet<String>,
    /// Tags fixed by the behavior type; never removed while attached
    pub(crate) class_tags: &'static [&'static str],
    pub(crate) flags: NodeFlags,
    /// `None` for behaviorless nodes, and while the behavior is on loan to a callback
    pub(crate) behavior: Option<Box<dyn Behavior>>,
}

impl NodeEntry {
    pub(crate) fn view(&self, id: NodeId) -> NodeView<'_> {
        NodeView {
            id,
            parent: self.parent,
            tags: &self.tags,
            flags: self.flags,
        }
    }
}

/// Scene: node arena, tag index, identity allocator and mutation queues
pub struct Scene {
    pub(crate) nodes: HashMap<NodeId, NodeEntry>,
    pub(crate) index: TagIndex,
    pub(crate) ids: IdAllocator,
    pub(crate) queues: MutationQueues,
}

impl Scene {
    /// Create a root-only scene allocating identities from `range`
    pub fn new(range: IdRange) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            ROOT_ID,
            NodeEntry {
                parent: None,
                children: Vec::new(),
                tags: BTreeSet::new(),
                class_tags: &[],
                flags: NodeFlags::empty(),
                behavior: None,
            },
        );
        Self {
            nodes,
            index: TagIndex::new(),
            ids: IdAllocator::new(range),
            queues: MutationQueues::default(),
        }
    }

    /// Identity of the root node
    pub fn root(&self) -> NodeId {
        ROOT_ID
    }

    /// Number of attached nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check whether only the root is attached
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Check whether a node is attached
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Parent of an attached node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|entry| entry.parent)
    }

    /// Ordered children of an attached node
    pub fn children(&self, id: NodeId) -> Option<&[NodeId]> {
        self.nodes.get(&id).map(|entry| entry.children.as_slice())
    }

    /// Tag set of an attached node
    pub fn tags(&self, id: NodeId) -> Option<&BTreeSet<String>> {
        self.nodes.get(&id).map(|entry| &entry.tags)
    }

    /// Read-only view of an attached node
    pub fn view(&self, id: NodeId) -> Option<NodeView<'_>> {
        self.nodes.get(&id).map(|entry| entry.view(id))
    }

    /// Traversal flags of an attached node
    pub fn flags(&self, id: NodeId) -> Option<NodeFlags> {
        self.nodes.get(&id).map(|entry| entry.flags)
    }

    /// Replace the traversal flags of an attached node
    ///
    /// Returns `false` if the node is not attached.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) -> bool {
        self.nodes.get_mut(&id).map_or(false, |entry| {
            entry.flags = flags;
            true
        })
    }

    /// Iterate over every attached identity, in no particular order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Add instance tags to an attached node
    ///
    /// Returns `false` if the node is not attached.
    pub fn add_tags<S: AsRef<str>>(&mut self, id: NodeId, tags: &[S]) -> bool {
        let Some(entry) = self.nodes.get_mut(&id) else {
            return false;
        };
        entry.tags.extend(tags.iter().map(|tag| tag.as_ref().to_string()));
        self.index.add_tags(id, tags);
        true
    }

    /// Remove instance tags from an attached node
    ///
    /// Class tags of the node's behavior are kept. Returns `false` if the node
    /// is not attached.
    pub fn remove_tags<S: AsRef<str>>(&mut self, id: NodeId, tags: &[S]) -> bool {
        let Some(entry) = self.nodes.get_mut(&id) else {
            return false;
        };
        let class_tags = entry.class_tags;
        let removable: Vec<&str> = tags
            .iter()
            .map(AsRef::as_ref)
            .filter(|tag| !class_tags.iter().any(|class| class == tag))
            .collect();
        for tag in &removable {
            entry.tags.remove(*tag);
        }
        self.index.remove_tags(id, &removable);
        true
    }

    /// Find attached nodes by tag, in ascending identity order
    ///
    /// With no tags every attached node is returned, root included.
    pub fn query<S: AsRef<str>>(&self, tags: &[S], mode: QueryMode) -> Vec<NodeId> {
        match self.index.query(tags, mode) {
            Some(matches) => matches.into_iter().collect(),
            None => {
                let mut all: Vec<NodeId> = self.ids().collect();
                all.sort_unstable();
                all
            }
        }
    }

    /// The tag index
    pub fn tag_index(&self) -> &TagIndex {
        &self.index
    }

    /// Queue an add of `node` (and its declared children) under `parent`
    pub fn add(&mut self, node: Node, parent: impl Into<ParentRef>) -> Pending<NodeId> {
        self.queues.push_add(node, parent.into())
    }

    /// Queue removal of a node and its whole subtree
    ///
    /// Cancels a queued move of the same node.
    pub fn remove(&mut self, id: NodeId) -> Pending<()> {
        self.queues.push_remove(id)
    }

    /// Queue a move of a node under a new parent
    ///
    /// Rejected with `ScheduledForRemoval` when the removal of the node or of
    /// one of its ancestors is already queued.
    pub fn move_to(&mut self, id: NodeId, new_parent: NodeId) -> Pending<()> {
        let doomed = self
            .queues
            .removal_ids()
            .any(|removed| self.is_ancestor_or_self(removed, id));
        self.queues.push_move(id, new_parent, doomed)
    }

    /// Check whether structural changes are waiting to be applied
    pub fn has_pending_mutations(&self) -> bool {
        !self.queues.is_empty()
    }

    /// Check whether a removal of `id` is queued
    pub fn is_pending_removal(&self, id: NodeId) -> bool {
        self.queues.is_pending_removal(id)
    }

    /// Identities of a subtree, descendants before their ancestors
    pub fn post_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        if !self.contains(id) {
            return order;
        }
        // (node, children already expanded)
        let mut stack = vec![(id, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                order.push(node);
                continue;
            }
            stack.push((node, true));
            if let Some(children) = self.children(node) {
                stack.extend(children.iter().rev().map(|child| (*child, false)));
            }
        }
        order
    }

    /// Check whether `ancestor` is `node` or lies on its parent chain
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Run a callback with a node's behavior on loan
    ///
    /// Returns `None` if the node is not attached or has no behavior (or its
    /// behavior is already on loan further up the call stack).
    pub(crate) fn with_behavior<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut dyn Behavior, &mut NodeContext<'_>) -> R,
    ) -> Option<R> {
        let mut behavior = self.nodes.get_mut(&id)?.behavior.take()?;
        let result = {
            let mut ctx = NodeContext::new(id, self);
            f(behavior.as_mut(), &mut ctx)
        };
        match self.nodes.get_mut(&id) {
            Some(entry) => entry.behavior = Some(behavior),
            None => log::warn!("Behavior of {id} returned after the node left the scene"),
        }
        Some(result)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(IdRange::default())
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("nodes", &self.nodes.len())
            .field("tags", &self.index.tag_count())
            .field("queues", &self.queues)
            .finish_non_exhaustive()
    }
}
