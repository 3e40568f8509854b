//! Node identities and the wrapping identity allocator

use std::collections::HashSet;
use std::fmt;

use crate::config::IdRange;
use crate::scene::MutationError;

/// Node identifier
///
/// Assigned once when a node is attached and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// Identity of the root node
pub const ROOT_ID: NodeId = NodeId(0);

impl NodeId {
    /// Create a node ID from its raw value
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw ID value
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check whether this is the root identity
    pub const fn is_root(self) -> bool {
        self.0 == ROOT_ID.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Hands out unused identities from an inclusive range, wrapping around
#[derive(Debug, Clone)]
pub struct IdAllocator {
    range: IdRange,
    next: u32,
    in_use: HashSet<NodeId>,
}

impl IdAllocator {
    /// Create an allocator over the given range
    ///
    /// The root identity is always reserved, whether or not it falls inside the range.
    pub fn new(range: IdRange) -> Self {
        let mut in_use = HashSet::new();
        in_use.insert(ROOT_ID);
        Self {
            range,
            next: range.min,
            in_use,
        }
    }

    /// Allocate the next free identity
    ///
    /// Scans forward from the position after the previous allocation, wrapping
    /// from `max` back to `min`. Fails once a full cycle finds nothing free.
    pub fn allocate(&mut self) -> Result<NodeId, MutationError> {
        let exhausted = MutationError::ExhaustedIdentitySpace {
            min: self.range.min,
            max: self.range.max,
        };
        if self.range.is_empty() {
            return Err(exhausted);
        }

        let mut candidate = self.next;
        for _ in 0..self.range.len() {
            let id = NodeId(candidate);
            let following = self.advance(candidate);
            if !self.in_use.contains(&id) {
                self.in_use.insert(id);
                self.next = following;
                return Ok(id);
            }
            candidate = following;
        }
        Err(exhausted)
    }

    /// Claim a specific identity chosen by the caller
    ///
    /// Returns `false` if the identity is already in use.
    pub fn reserve(&mut self, id: NodeId) -> bool {
        self.in_use.insert(id)
    }

    /// Return an identity to the pool
    ///
    /// The root identity can never be released.
    pub fn release(&mut self, id: NodeId) {
        if !id.is_root() {
            self.in_use.remove(&id);
        }
    }

    /// Check whether an identity is currently in use
    pub fn in_use(&self, id: NodeId) -> bool {
        self.in_use.contains(&id)
    }

    /// Number of identities in use, root included
    pub fn used(&self) -> usize {
        self.in_use.len()
    }

    /// The configured range
    pub fn range(&self) -> IdRange {
        self.range
    }

    fn advance(&self, current: u32) -> u32 {
        if current >= self.range.max {
            self.range.min
        } else {
            current + 1
        }
    }
}
