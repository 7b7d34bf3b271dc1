// src/core/storage/memory.rs

//! The bounded in-process memory tier.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use crate::core::storage::entry::CacheEntry;

const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(1024).unwrap();

/// First-tier cache: a fixed-capacity key/value store with LRU eviction,
/// shared across concurrent operations within a process. Lost on restart.
///
/// The map is guarded by a mutex held across each whole check-then-act
/// sequence rather than relying on scheduler cooperation.
#[derive(Debug)]
pub struct MemoryTier {
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl MemoryTier {
    /// Creates a tier holding at most `capacity` entries; zero falls back to
    /// the default capacity.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.lock().get(key).cloned()
    }

    pub fn put(&self, key: String, entry: CacheEntry) {
        self.entries.lock().put(key, entry);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::entry::{CachedValue, FetchPayload};

    fn sample_entry(marker: u64) -> CacheEntry {
        CacheEntry {
            last_modified: marker,
            value: CachedValue::Fetch(FetchPayload {
                body: serde_json::json!({ "marker": marker }),
                tags: vec![],
            }),
        }
    }

    #[test]
    fn test_lru_eviction_drops_the_oldest_entry() {
        let tier = MemoryTier::new(2);
        tier.put("a".to_string(), sample_entry(1));
        tier.put("b".to_string(), sample_entry(2));
        tier.put("c".to_string(), sample_entry(3));

        assert!(tier.get("a").is_none());
        assert!(tier.get("b").is_some());
        assert!(tier.get("c").is_some());
        assert_eq!(tier.len(), 2);
    }

    #[test]
    fn test_zero_capacity_falls_back_to_default() {
        let tier = MemoryTier::new(0);
        tier.put("a".to_string(), sample_entry(1));
        assert!(!tier.is_empty());
    }
}
