// Path: crates/filter/src/cache.rs
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use hearth_api::filter_runtime::FilterVerdict;

/// Key into the filter-result cache: `(event-id, instructions-hash)` per
/// spec §3/§4.8.
pub type CacheKey = ([u8; 32], [u8; 32]);

pub fn instructions_hash(instructions: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(instructions.as_bytes());
    hasher.finalize().into()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    verdict: FilterVerdict,
    inserted_at: Instant,
}

/// A bounded, mutex-free (entry-level-atomic via `DashMap`) TTL cache of
/// filter verdicts. Evicts the oldest ~10% of entries once size exceeds
/// `max_size`, per spec §4.8 step 6. Expired entries may linger until
/// touched (spec §3's ownership note), mirroring the access-cache's
/// lingering-but-ignored behavior in spec §4.4.
pub struct FilterCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: Duration,
    max_size: usize,
}

impl FilterCache {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        FilterCache {
            entries: DashMap::new(),
            ttl,
            max_size,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<FilterVerdict> {
        let entry = self.entries.get(key)?;
        if entry.inserted_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.verdict.clone())
    }

    pub fn insert(&self, key: CacheKey, verdict: FilterVerdict) {
        self.entries.insert(
            key,
            CacheEntry {
                verdict,
                inserted_at: Instant::now(),
            },
        );
        if self.entries.len() > self.max_size {
            self.evict_oldest_tenth();
        }
    }

    fn evict_oldest_tenth(&self) {
        let mut ages: Vec<(CacheKey, Instant)> = self
            .entries
            .iter()
            .map(|e| (*e.key(), e.value().inserted_at))
            .collect();
        ages.sort_by_key(|(_, inserted_at)| *inserted_at);
        let evict_count = (ages.len() / 10).max(1);
        for (key, _) in ages.into_iter().take(evict_count) {
            self.entries.remove(&key);
        }
    }

    /// Drops every entry whose TTL has expired. Run periodically by the
    /// background purge task (spec §4.8's closing paragraph).
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() <= self.ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_within_ttl_returns_cached_verdict() {
        let cache = FilterCache::new(100, Duration::from_secs(60));
        let key = ([1u8; 32], [2u8; 32]);
        cache.insert(key, FilterVerdict::pass("skipped"));
        assert_eq!(cache.get(&key), Some(FilterVerdict::pass("skipped")));
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let cache = FilterCache::new(100, Duration::from_millis(1));
        let key = ([1u8; 32], [2u8; 32]);
        cache.insert(key, FilterVerdict::pass("skipped"));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn exceeding_max_size_evicts_oldest_tenth() {
        let cache = FilterCache::new(10, Duration::from_secs(60));
        for i in 0..11u8 {
            cache.insert(([i; 32], [0u8; 32]), FilterVerdict::pass("x"));
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(cache.len() <= 10);
        assert!(cache.get(&([0u8; 32], [0u8; 32])).is_none());
    }
}
