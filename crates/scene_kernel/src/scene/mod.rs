//! Scene module
//!
//! Owns the node tree and everything needed to change it safely:
//! - Identity allocation
//! - Tag indexing and queries
//! - Deferred add/remove/move queues
//! - Update and draw traversals

pub mod error;
pub mod identity;
pub mod mutation;
pub mod node;
pub mod tags;
pub mod traversal;
pub mod tree;

#[cfg(test)]
mod tests;

pub use error::MutationError;
pub use identity::{IdAllocator, NodeId, ROOT_ID};
pub use mutation::{AddTicket, MutationQueues, MutationReport, ParentRef, Pending};
pub use node::{Behavior, Capabilities, Node, NodeContext, NodeFlags, NodeView};
pub use tags::{QueryMode, TagIndex};
pub use traversal::DrawReport;
pub use tree::Scene;
