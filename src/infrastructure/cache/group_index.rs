//! Local registry of which keys this process wrote under each group

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Maps a group name to the keys this process populated under it.
///
/// The index is process-local: it never learns about keys other instances
/// wrote. A poisoned lock is recovered rather than propagated.
#[derive(Debug, Default)]
pub struct GroupIndex {
    groups: RwLock<HashMap<String, HashSet<String>>>,
}

impl GroupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key` under `group`. Idempotent.
    pub fn track(&self, group: &str, key: &str) {
        let mut groups = self.groups.write().unwrap_or_else(|e| e.into_inner());

        groups
            .entry(group.to_string())
            .or_default()
            .insert(key.to_string());
    }

    /// Snapshot of the keys tracked for `group`
    pub fn keys_of(&self, group: &str) -> HashSet<String> {
        let groups = self.groups.read().unwrap_or_else(|e| e.into_inner());
        groups.get(group).cloned().unwrap_or_default()
    }

    /// Removes and returns the keys tracked for `group` in one step. Keys
    /// tracked afterwards start a fresh set for the next invalidation.
    pub fn take(&self, group: &str) -> HashSet<String> {
        let mut groups = self.groups.write().unwrap_or_else(|e| e.into_inner());
        groups.remove(group).unwrap_or_default()
    }

    pub fn group_count(&self) -> usize {
        self.groups.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_and_keys_of() {
        let index = GroupIndex::new();
        index.track("users", "users:list:");
        index.track("users", "users:42");
        index.track("users", "users:42");

        let keys = index.keys_of("users");
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("users:list:"));
    }

    #[test]
    fn test_unknown_group_is_empty() {
        let index = GroupIndex::new();
        assert!(index.keys_of("ghost").is_empty());
    }

    #[test]
    fn test_take_removes_whole_group() {
        let index = GroupIndex::new();
        index.track("users", "users:list:");
        index.track("teams", "teams:list:");

        let taken = index.take("users");

        assert_eq!(taken.len(), 1);
        assert!(taken.contains("users:list:"));
        assert!(index.keys_of("users").is_empty());
        assert_eq!(index.keys_of("teams").len(), 1);
        assert_eq!(index.group_count(), 1);
    }

    #[test]
    fn test_take_unknown_group_is_empty() {
        let index = GroupIndex::new();
        assert!(index.take("ghost").is_empty());
        assert_eq!(index.group_count(), 0);
    }

    #[test]
    fn test_keys_tracked_after_take_are_kept() {
        let index = GroupIndex::new();
        index.track("users", "users:list:");

        index.take("users");
        index.track("users", "users:list:page=9");

        let keys = index.keys_of("users");
        assert_eq!(keys.len(), 1);
        assert!(keys.contains("users:list:page=9"));
    }
}
