//! Bounded recency set deciding which segment URLs are new.

use std::collections::HashSet;

/// Remembers the last `capacity` accepted segment identifiers.
///
/// Identifiers live in a fixed circular array; a hash set over the same
/// identifiers answers membership in O(1). Inserting into a full cache
/// overwrites the slot under the cursor, evicting the oldest identifier.
/// An identifier evicted this way is treated as new again.
#[derive(Debug, Clone)]
pub struct SegmentDedupCache {
    slots: Vec<Option<String>>,
    cursor: usize,
    members: HashSet<String>,
}

impl SegmentDedupCache {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![None; capacity],
            cursor: 0,
            members: HashSet::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Record `id`. Returns `false` when it is already present, in which case
    /// nothing changes.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.members.contains(&id) {
            return false;
        }

        if let Some(evicted) = self.slots[self.cursor].take() {
            self.members.remove(&evicted);
        }

        self.members.insert(id.clone());
        self.slots[self.cursor] = Some(id);
        self.cursor = (self.cursor + 1) % self.slots.len();
        true
    }

}

impl Default for SegmentDedupCache {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_DEDUP_CAPACITY)
    }
}
