use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use doclink_types::StorageKey;

/// Keys already claimed for fetching within one top-level resolve call.
///
/// Shared by reference across the whole call tree, including recursive and
/// concurrent branches. Create a fresh set per top-level call; it is
/// intentionally not `Clone`.
#[derive(Debug, Default)]
pub struct InFlightSet {
    keys: Mutex<HashSet<StorageKey>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`. Returns `false` if it was already claimed.
    pub fn try_claim(&self, key: &StorageKey) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone())
    }

    pub fn contains(&self, key: &StorageKey) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Documents the caller already holds and does not want fetched again.
pub trait RecordCache: Send + Sync {
    fn contains(&self, key: &StorageKey) -> bool;
}

/// A cache that holds nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCache;

impl RecordCache for NoCache {
    fn contains(&self, _key: &StorageKey) -> bool {
        false
    }
}

impl RecordCache for HashSet<StorageKey> {
    fn contains(&self, key: &StorageKey) -> bool {
        HashSet::contains(self, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doclink_types::KeyCodec;

    #[test]
    fn claim_once() {
        let set = InFlightSet::new();
        let key = KeyCodec::encode("item", "x").unwrap();
        assert!(set.is_empty());
        assert!(set.try_claim(&key));
        assert!(!set.try_claim(&key));
        assert!(set.contains(&key));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn hash_set_cache() {
        let key = KeyCodec::encode("item", "x").unwrap();
        let cache: HashSet<StorageKey> = [key.clone()].into_iter().collect();
        assert!(RecordCache::contains(&cache, &key));
        assert!(!NoCache.contains(&key));
    }
}
