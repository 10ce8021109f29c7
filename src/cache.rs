use crate::backend::QueryResult;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of the current instant, injectable so expiry can be tested.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: Arc<QueryResult>,
    pub expires_at: Instant,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Upper bound on distinct cached queries.
const MAX_ENTRIES: u64 = 10_000;

/// Time-bounded memoization of query results, keyed by
/// [`Query::cache_key`](crate::backend::Query::cache_key).
///
/// An entry lives for a fixed TTL from the moment it is stored. Expiry is
/// judged against the injected [`Clock`]; expired entries are dropped lazily
/// on lookup or eagerly via [`purge_expired`](Self::purge_expired).
pub struct QueryCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Cache<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ttl)
                .build(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a live entry. An expired entry is removed and counts as a miss.
    pub fn get(&mut self, key: &str) -> Option<Arc<QueryResult>> {
        let now = self.clock.now();
        let live = self
            .entries
            .get(key)
            .map(|entry| (now < entry.expires_at).then_some(entry.result));
        match live {
            Some(Some(result)) => {
                self.hits += 1;
                Some(result)
            }
            Some(None) => {
                self.entries.remove(key);
                self.misses += 1;
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, key: String, result: Arc<QueryResult>) {
        let expires_at = self.clock.now() + self.ttl;
        self.entries.insert(key, CacheEntry { result, expires_at });
    }

    /// Drop one entry. Returns whether it was present.
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn invalidate_all(&mut self) {
        let keys: Vec<Arc<String>> = self.entries.iter().map(|(key, _)| key).collect();
        for key in keys {
            self.entries.remove(key.as_str());
        }
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let expired: Vec<Arc<String>> = self
            .entries
            .iter()
            .filter(|(_, entry)| now >= entry.expires_at)
            .map(|(key, _)| key)
            .collect();
        expired
            .iter()
            .filter(|key| self.entries.remove(key.as_str()).is_some())
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.len(),
        }
    }
}
