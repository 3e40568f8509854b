//! Tag index
//!
//! Maps tag strings to the set of attached nodes carrying them. Tags whose
//! last holder goes away are pruned, so the index never keeps empty entries.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::scene::NodeId;

/// How a multi-tag query combines the per-tag sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    /// Union of every listed tag's holders
    #[default]
    Inclusive,
    /// Intersection, narrowed tag by tag in the order given
    Exclusive,
}

/// Tag to node index
#[derive(Debug, Default, Clone)]
pub struct TagIndex {
    tags: HashMap<String, HashSet<NodeId>>,
}

impl TagIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` under each tag; already present pairs are left alone
    pub fn add_tags<S: AsRef<str>>(&mut self, id: NodeId, tags: &[S]) {
        for tag in tags {
            let tag = tag.as_ref();
            match self.tags.get_mut(tag) {
                Some(holders) => {
                    holders.insert(id);
                }
                None => {
                    self.tags.insert(tag.to_string(), HashSet::from([id]));
                }
            }
        }
    }

    /// Unregister `id` from each tag, dropping tags left without holders
    pub fn remove_tags<S: AsRef<str>>(&mut self, id: NodeId, tags: &[S]) {
        for tag in tags {
            let tag = tag.as_ref();
            if let Some(holders) = self.tags.get_mut(tag) {
                holders.remove(&id);
                if holders.is_empty() {
                    self.tags.remove(tag);
                }
            }
        }
    }

    /// Holders of a single tag
    pub fn holders(&self, tag: &str) -> Option<&HashSet<NodeId>> {
        self.tags.get(tag)
    }

    /// Check whether any node carries the tag
    pub fn contains_tag(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    /// Number of distinct tags with at least one holder
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// Query the index
    ///
    /// Returns `None` when no tags are given; the caller decides what "every
    /// node" means, since the index only knows tagged nodes.
    pub fn query<S: AsRef<str>>(&self, tags: &[S], mode: QueryMode) -> Option<BTreeSet<NodeId>> {
        let (first, rest) = tags.split_first()?;

        let result = match mode {
            QueryMode::Inclusive => tags
                .iter()
                .filter_map(|tag| self.tags.get(tag.as_ref()))
                .flatten()
                .copied()
                .collect(),
            QueryMode::Exclusive => {
                let mut matches: BTreeSet<NodeId> = self
                    .tags
                    .get(first.as_ref())
                    .map(|holders| holders.iter().copied().collect())
                    .unwrap_or_default();
                for tag in rest {
                    if matches.is_empty() {
                        break;
                    }
                    match self.tags.get(tag.as_ref()) {
                        Some(holders) => matches.retain(|id| holders.contains(id)),
                        None => matches.clear(),
                    }
                }
                matches
            }
        };
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u32]) -> BTreeSet<NodeId> {
        raw.iter().copied().map(NodeId::new).collect()
    }

    fn sample() -> TagIndex {
        let mut index = TagIndex::new();
        index.add_tags(NodeId::new(1), &["a"]);
        index.add_tags(NodeId::new(2), &["a", "b"]);
        index.add_tags(NodeId::new(3), &["b"]);
        index
    }

    #[test]
    fn test_inclusive_and_exclusive_queries() {
        let index = sample();
        assert_eq!(index.query(&["a", "b"], QueryMode::Exclusive), Some(ids(&[2])));
        assert_eq!(index.query(&["a", "b"], QueryMode::Inclusive), Some(ids(&[1, 2, 3])));
    }

    #[test]
    fn test_add_tags_is_idempotent() {
        let mut index = sample();
        index.add_tags(NodeId::new(1), &["a", "a"]);
        assert_eq!(index.holders("a").map(HashSet::len), Some(2));
    }

    #[test]
    fn test_last_holder_prunes_tag() {
        let mut index = TagIndex::new();
        index.add_tags(NodeId::new(4), &["x"]);
        index.remove_tags(NodeId::new(4), &["x"]);
        assert!(!index.contains_tag("x"));
        assert_eq!(index.tag_count(), 0);
        assert_eq!(index.query(&["x"], QueryMode::Inclusive), Some(BTreeSet::new()));
    }

    #[test]
    fn test_remove_absent_tag_is_noop() {
        let mut index = sample();
        index.remove_tags(NodeId::new(1), &["b", "missing"]);
        assert_eq!(index.query(&["b"], QueryMode::Inclusive), Some(ids(&[2, 3])));
    }

    #[test]
    fn test_exclusive_with_unknown_tag_anywhere_is_empty() {
        let index = sample();
        assert_eq!(index.query(&["nope", "a"], QueryMode::Exclusive), Some(BTreeSet::new()));
        assert_eq!(index.query(&["a", "nope", "b"], QueryMode::Exclusive), Some(BTreeSet::new()));
        assert_eq!(index.query(&["a", "b", "nope"], QueryMode::Exclusive), Some(BTreeSet::new()));
    }

    #[test]
    fn test_inclusive_ignores_unknown_tags() {
        let index = sample();
        assert_eq!(index.query(&["nope", "a"], QueryMode::Inclusive), Some(ids(&[1, 2])));
    }

    #[test]
    fn test_empty_tag_list_defers_to_caller() {
        let index = sample();
        assert_eq!(index.query::<&str>(&[], QueryMode::Inclusive), None);
    }
}
