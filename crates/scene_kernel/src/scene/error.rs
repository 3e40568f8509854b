//! Structural mutation errors

use thiserror::Error;

use crate::scene::{NodeId, ParentRef};

/// Reasons an add, remove or move request was rejected
///
/// Every variant is local to the request that produced it: the scheduler
/// keeps running and the tree is left untouched by the rejected operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    /// No free identity left in the configured range
    #[error("Identity space {min}..={max} is exhausted")]
    ExhaustedIdentitySpace {
        /// Lower bound of the range
        min: u32,
        /// Upper bound of the range
        max: u32,
    },

    /// The add targeted a parent that is not attached
    #[error("Parent {0} not found")]
    ParentNotFound(ParentRef),

    /// The node was already removed from the tree
    #[error("Node {0} was already removed")]
    AlreadyRemoved(NodeId),

    /// A node carrying this identity is already attached
    #[error("Node {0} is already attached")]
    AlreadyAttached(NodeId),

    /// The node has a pending removal
    #[error("Node {0} is scheduled for removal")]
    ScheduledForRemoval(NodeId),

    /// The node or the target parent of a move does not exist
    #[error("Node {0} not found")]
    NotFound(NodeId),

    /// The root can be neither removed nor reparented
    #[error("The root node cannot be removed or moved")]
    RootMutationForbidden,

    /// The move would place a node underneath itself
    #[error("Cannot move {node} under its own descendant {parent}")]
    CyclicMove {
        /// Node being moved
        node: NodeId,
        /// Requested parent inside the node's subtree
        parent: NodeId,
    },
}
