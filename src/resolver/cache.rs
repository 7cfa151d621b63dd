//! Session cache for resolved author tokens.
//!
//! Keys are the tokens exactly as typed (case-sensitive). Entries are
//! never invalidated; a bounded LRU only keeps a long session from growing
//! without limit. Concurrent writers for the same token simply overwrite
//! each other.

use lru::LruCache;
use nostr_sdk::PublicKey;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

const DEFAULT_CAPACITY: usize = 4096;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub size: usize,
}

#[derive(Debug)]
pub struct AuthorCache {
    entries: Mutex<LruCache<String, PublicKey>>,
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
}

impl Default for AuthorCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
        }
    }

    pub fn get(&self, token: &str) -> Option<PublicKey> {
        let found = self.entries.lock().get(token).copied();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Last write wins.
    pub fn set(&self, token: &str, pubkey: PublicKey) {
        self.entries.lock().put(token.to_string(), pubkey);
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            size: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr_sdk::Keys;

    #[test]
    fn get_set_clear() {
        let cache = AuthorCache::new();
        let pk = Keys::generate().public_key();

        assert_eq!(cache.get("alice"), None);
        cache.set("alice", pk);
        assert_eq!(cache.get("alice"), Some(pk));
        assert_eq!(cache.get("Alice"), None);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn last_write_wins() {
        let cache = AuthorCache::new();
        let first = Keys::generate().public_key();
        let second = Keys::generate().public_key();
        cache.set("bob", first);
        cache.set("bob", second);
        assert_eq!(cache.get("bob"), Some(second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn tracks_stats() {
        let cache = AuthorCache::with_capacity(2);
        let pk = Keys::generate().public_key();
        cache.set("a", pk);
        cache.get("a");
        cache.get("b");
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.stores, stats.size), (1, 1, 1, 1));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let cache = AuthorCache::with_capacity(0);
        cache.set("a", Keys::generate().public_key());
        assert_eq!(cache.len(), 1);
    }
}
