//! Deferred structural mutation
//!
//! Add, remove and move requests are buffered as records and applied between
//! traversal passes by [`Scene::apply_mutations`]. Each request hands back a
//! [`Pending`] handle backed by a one-shot channel that resolves exactly once,
//! at the application point following the request.
//!
//! Application order is removes, then moves, then adds, each in request order.

use std::collections::HashSet;
use std::fmt;

use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError};

use crate::scene::node::NodeContext;
use crate::scene::tree::NodeEntry;
use crate::scene::{MutationError, Node, NodeId, Scene};

/// Handle to an add that has been requested but not applied yet
///
/// Lets a later add in the same batch use the not-yet-attached node as its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddTicket(u64);

/// Parent target of an add request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    /// An attached node
    Node(NodeId),
    /// A node whose add is queued earlier in the same batch
    Pending(AddTicket),
}

impl From<NodeId> for ParentRef {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<AddTicket> for ParentRef {
    fn from(ticket: AddTicket) -> Self {
        Self::Pending(ticket)
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => write!(f, "{id}"),
            Self::Pending(ticket) => write!(f, "pending add #{}", ticket.0),
        }
    }
}

/// Outcome handle of a structural request
#[must_use = "the handle is the only place a rejection is reported"]
pub struct Pending<T> {
    receiver: Receiver<Result<T, MutationError>>,
    outcome: Option<Result<T, MutationError>>,
    ticket: Option<AddTicket>,
}

impl<T> Pending<T> {
    fn channel(ticket: Option<AddTicket>) -> (Self, Completion<T>) {
        let (sender, receiver) = bounded(1);
        (
            Self {
                receiver,
                outcome: None,
                ticket,
            },
            Completion { sender },
        )
    }

    /// Ticket for using the added node as a parent within the same batch
    ///
    /// Only add requests carry a ticket.
    pub fn ticket(&self) -> Option<AddTicket> {
        self.ticket
    }

    /// Check for the outcome without blocking
    ///
    /// Returns `None` until the request has been applied.
    pub fn poll(&mut self) -> Option<&Result<T, MutationError>> {
        if self.outcome.is_none() {
            match self.receiver.try_recv() {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => {}
            }
        }
        self.outcome.as_ref()
    }

    /// Check whether the request has been applied
    pub fn is_resolved(&mut self) -> bool {
        self.poll().is_some()
    }

    /// Take the outcome, if resolved
    pub fn take(&mut self) -> Option<Result<T, MutationError>> {
        self.poll();
        self.outcome.take()
    }
}

impl<T: Clone> Pending<T> {
    /// Copy of the outcome, if resolved
    pub fn result(&mut self) -> Option<Result<T, MutationError>> {
        self.poll().cloned()
    }
}

impl<T> fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("ticket", &self.ticket)
            .field("resolved", &self.outcome.is_some())
            .finish_non_exhaustive()
    }
}

/// Sending half of a [`Pending`] handle
struct Completion<T> {
    sender: Sender<Result<T, MutationError>>,
}

impl<T> Completion<T> {
    fn finish(self, outcome: Result<T, MutationError>) {
        // The requester may have dropped its handle
        let _ = self.sender.try_send(outcome);
    }
}

struct AddRecord {
    ticket: AddTicket,
    node: Node,
    parent: ParentRef,
    done: Completion<NodeId>,
}

struct RemoveRecord {
    id: NodeId,
    waiters: Vec<Completion<()>>,
}

struct MoveRecord {
    id: NodeId,
    parent: NodeId,
    waiters: Vec<Completion<()>>,
}

/// Pending structural changes awaiting the next application point
#[derive(Default)]
pub struct MutationQueues {
    adds: Vec<AddRecord>,
    removes: Vec<RemoveRecord>,
    moves: Vec<MoveRecord>,
    rejected: Vec<(Completion<()>, MutationError)>,
    next_ticket: u64,
}

impl MutationQueues {
    /// Check whether anything is waiting to be applied
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty()
            && self.removes.is_empty()
            && self.moves.is_empty()
            && self.rejected.is_empty()
    }

    /// Number of queued records, deferred rejections included
    pub fn len(&self) -> usize {
        self.adds.len() + self.removes.len() + self.moves.len() + self.rejected.len()
    }

    /// Check whether a removal of `id` is queued
    pub fn is_pending_removal(&self, id: NodeId) -> bool {
        self.removes.iter().any(|record| record.id == id)
    }

    /// Check whether a move of `id` is queued
    pub fn is_pending_move(&self, id: NodeId) -> bool {
        self.moves.iter().any(|record| record.id == id)
    }

    pub(crate) fn push_add(&mut self, node: Node, parent: ParentRef) -> Pending<NodeId> {
        let ticket = AddTicket(self.next_ticket);
        self.next_ticket += 1;
        let (pending, done) = Pending::channel(Some(ticket));
        self.adds.push(AddRecord {
            ticket,
            node,
            parent,
            done,
        });
        pending
    }

    pub(crate) fn push_remove(&mut self, id: NodeId) -> Pending<()> {
        let (pending, done) = Pending::channel(None);
        if id.is_root() {
            self.rejected.push((done, MutationError::RootMutationForbidden));
            return pending;
        }

        // A queued move of the same node is superseded by the removal
        if let Some(index) = self.moves.iter().position(|record| record.id == id) {
            let cancelled = self.moves.remove(index);
            log::debug!("Removal of {id} cancels its pending move to {}", cancelled.parent);
            for waiter in cancelled.waiters {
                self.rejected.push((waiter, MutationError::ScheduledForRemoval(id)));
            }
        }

        match self.removes.iter_mut().find(|record| record.id == id) {
            Some(record) => record.waiters.push(done),
            None => self.removes.push(RemoveRecord {
                id,
                waiters: vec![done],
            }),
        }
        pending
    }

    /// Identities whose removal is queued
    pub(crate) fn removal_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.removes.iter().map(|record| record.id)
    }

    /// Queue a move; `doomed` marks a node inside a subtree already queued for removal
    pub(crate) fn push_move(&mut self, id: NodeId, parent: NodeId, doomed: bool) -> Pending<()> {
        let (pending, done) = Pending::channel(None);
        if id.is_root() {
            self.rejected.push((done, MutationError::RootMutationForbidden));
            return pending;
        }
        if doomed || self.is_pending_removal(id) {
            self.rejected.push((done, MutationError::ScheduledForRemoval(id)));
            return pending;
        }

        // At most one move per node: the latest target wins
        match self.moves.iter_mut().find(|record| record.id == id) {
            Some(record) => {
                record.parent = parent;
                record.waiters.push(done);
            }
            None => self.moves.push(MoveRecord {
                id,
                parent,
                waiters: vec![done],
            }),
        }
        pending
    }
}

impl fmt::Debug for MutationQueues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationQueues")
            .field("adds", &self.adds.len())
            .field("removes", &self.removes.len())
            .field("moves", &self.moves.len())
            .field("rejected", &self.rejected.len())
            .finish()
    }
}

/// Summary of one application phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationReport {
    /// Subtrees attached
    pub added: usize,
    /// Subtrees detached
    pub removed: usize,
    /// Nodes reparented
    pub moved: usize,
    /// Requests rejected
    pub rejected: usize,
}

impl MutationReport {
    /// Check whether the phase did nothing at all
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.moved == 0 && self.rejected == 0
    }

    /// Fold another phase's counts into this one
    pub fn merge(&mut self, other: Self) {
        self.added += other.added;
        self.removed += other.removed;
        self.moved += other.moved;
        self.rejected += other.rejected;
    }
}

impl Scene {
    /// Apply every queued removal, move and add, in that order
    ///
    /// Requests made by lifecycle hooks while this runs are queued for the
    /// next application point.
    pub fn apply_mutations(&mut self) -> MutationReport {
        let mut report = MutationReport::default();
        if self.queues.is_empty() {
            return report;
        }

        let queued = std::mem::take(&mut self.queues);
        // Tickets keep counting across batches
        self.queues.next_ticket = queued.next_ticket;
        let MutationQueues {
            adds,
            removes,
            moves,
            rejected,
            ..
        } = queued;

        for (waiter, error) in rejected {
            log::trace!("Rejecting deferred request: {error}");
            waiter.finish(Err(error));
            report.rejected += 1;
        }

        let mut detached = HashSet::new();
        for record in removes {
            let outcome = self.apply_remove(record.id, &mut detached);
            Self::tally(&mut report.removed, &mut report.rejected, &outcome);
            for waiter in record.waiters {
                waiter.finish(outcome.clone());
            }
        }

        for record in moves {
            // Descendants of a removed node leave with it
            let outcome = if detached.contains(&record.id) {
                Err(MutationError::ScheduledForRemoval(record.id))
            } else {
                self.apply_move(record.id, record.parent)
            };
            Self::tally(&mut report.moved, &mut report.rejected, &outcome);
            for waiter in record.waiters {
                waiter.finish(outcome.clone());
            }
        }

        let mut attached_tickets = std::collections::HashMap::new();
        for record in adds {
            let outcome = self.apply_add(record.node, record.parent, &attached_tickets);
            Self::tally(&mut report.added, &mut report.rejected, &outcome);
            if let Ok(id) = outcome {
                attached_tickets.insert(record.ticket, id);
            }
            record.done.finish(outcome);
        }

        log::debug!(
            "Applied mutations: {} added, {} removed, {} moved, {} rejected",
            report.added,
            report.removed,
            report.moved,
            report.rejected
        );
        report
    }

    fn tally<T>(applied: &mut usize, rejected: &mut usize, outcome: &Result<T, MutationError>) {
        match outcome {
            Ok(_) => *applied += 1,
            Err(error) => {
                log::trace!("Mutation rejected: {error}");
                *rejected += 1;
            }
        }
    }

    fn apply_add(
        &mut self,
        node: Node,
        parent: ParentRef,
        attached_tickets: &std::collections::HashMap<AddTicket, NodeId>,
    ) -> Result<NodeId, MutationError> {
        let parent_id = match parent {
            ParentRef::Node(id) => id,
            ParentRef::Pending(ticket) => *attached_tickets
                .get(&ticket)
                .ok_or(MutationError::ParentNotFound(parent))?,
        };
        if !self.contains(parent_id) {
            return Err(MutationError::ParentNotFound(parent));
        }

        // Claim every identity up front so a failure leaves the tree untouched
        let mut claimed = Vec::with_capacity(node.subtree_len());
        if let Err(error) = self.claim_identities(&node, &mut claimed) {
            for id in claimed {
                self.ids.release(id);
            }
            return Err(error);
        }

        let mut order = Vec::with_capacity(claimed.len());
        let mut claimed = claimed.into_iter();
        let root = self.attach_subtree(node, parent_id, &mut claimed, &mut order);
        log::trace!("Attached {root} under {parent_id} ({} nodes)", order.len());

        for id in order {
            self.with_behavior(id, |behavior, ctx| behavior.on_attached(ctx));
        }
        Ok(root)
    }

    /// Pre-order identity claim for a declared subtree
    fn claim_identities(&mut self, node: &Node, claimed: &mut Vec<NodeId>) -> Result<(), MutationError> {
        let id = match node.id {
            Some(id) => {
                if !self.ids.reserve(id) {
                    return Err(MutationError::AlreadyAttached(id));
                }
                id
            }
            None => self.ids.allocate()?,
        };
        claimed.push(id);
        for child in &node.children {
            self.claim_identities(child, claimed)?;
        }
        Ok(())
    }

    fn attach_subtree(
        &mut self,
        node: Node,
        parent: NodeId,
        claimed: &mut std::vec::IntoIter<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> NodeId {
        let Node {
            behavior,
            tags,
            flags,
            children,
            ..
        } = node;
        // Identities were claimed in the same pre-order walk
        let id = claimed.next().unwrap_or_else(|| unreachable!("identity claimed per node"));

        let class_tags = behavior.as_ref().map_or(&[][..], |behavior| behavior.class_tags());
        let mut tag_set: std::collections::BTreeSet<String> = tags.into_iter().collect();
        tag_set.extend(class_tags.iter().map(|tag| (*tag).to_string()));
        let tag_list: Vec<&String> = tag_set.iter().collect();
        self.index.add_tags(id, &tag_list);

        self.nodes.insert(
            id,
            NodeEntry {
                parent: Some(parent),
                children: Vec::with_capacity(children.len()),
                tags: tag_set,
                class_tags,
                flags,
                behavior,
            },
        );
        if let Some(parent_entry) = self.nodes.get_mut(&parent) {
            parent_entry.children.push(id);
        }
        order.push(id);

        for child in children {
            self.attach_subtree(child, id, claimed, order);
        }
        id
    }

    fn apply_remove(&mut self, id: NodeId, detached_ids: &mut HashSet<NodeId>) -> Result<(), MutationError> {
        if id.is_root() {
            return Err(MutationError::RootMutationForbidden);
        }
        if !self.contains(id) {
            return Err(MutationError::AlreadyRemoved(id));
        }

        if let Some(parent) = self.parent(id) {
            if let Some(parent_entry) = self.nodes.get_mut(&parent) {
                parent_entry.children.retain(|child| *child != id);
            }
        }

        let doomed = self.post_order(id);
        let mut detached = Vec::with_capacity(doomed.len());
        for node in doomed {
            if let Some(entry) = self.nodes.remove(&node) {
                let tags: Vec<&String> = entry.tags.iter().collect();
                self.index.remove_tags(node, &tags);
                self.ids.release(node);
                detached_ids.insert(node);
                detached.push((node, entry.behavior));
            }
        }
        log::trace!("Detached {id} ({} nodes)", detached.len());

        for (node, behavior) in detached {
            if let Some(mut behavior) = behavior {
                let mut ctx = NodeContext::new(node, self);
                behavior.on_detached(&mut ctx);
            }
        }
        Ok(())
    }

    fn apply_move(&mut self, id: NodeId, new_parent: NodeId) -> Result<(), MutationError> {
        if id.is_root() {
            return Err(MutationError::RootMutationForbidden);
        }
        if !self.contains(id) {
            return Err(MutationError::NotFound(id));
        }
        if !self.contains(new_parent) {
            return Err(MutationError::NotFound(new_parent));
        }
        if self.is_ancestor_or_self(id, new_parent) {
            return Err(MutationError::CyclicMove {
                node: id,
                parent: new_parent,
            });
        }

        let old_parent = self.parent(id).unwrap_or(crate::scene::ROOT_ID);
        if let Some(entry) = self.nodes.get_mut(&old_parent) {
            entry.children.retain(|child| *child != id);
        }
        if let Some(entry) = self.nodes.get_mut(&new_parent) {
            entry.children.push(id);
        }
        if let Some(entry) = self.nodes.get_mut(&id) {
            entry.parent = Some(new_parent);
        }
        log::trace!("Moved {id} from {old_parent} to {new_parent}");

        self.with_behavior(id, |behavior, ctx| behavior.on_moved(ctx, old_parent, new_parent));
        Ok(())
    }
}
