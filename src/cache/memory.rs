//! In-memory TTL cache.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use super::ResultCache;

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    /// `None` when the TTL does not fit the clock; such entries never expire.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }

    // Never-expiring entries sort last for eviction.
    fn eviction_rank(&self) -> (bool, Option<Instant>) {
        (self.expires_at.is_none(), self.expires_at)
    }
}

/// Thread-safe in-memory cache with per-entry expiry.
///
/// Expiry is checked lazily: an expired entry is dropped when it is read.
/// With `max_entries` set, a full cache first purges expired entries and
/// then evicts the entry closest to expiry.
///
/// Uses tokio's clock so tests can pause and advance time.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    max_entries: Option<usize>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the number of live entries.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: Some(max_entries),
        }
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    fn make_room(entries: &mut HashMap<String, Entry>, max: usize, now: Instant) {
        if entries.len() < max {
            return;
        }
        entries.retain(|_, entry| entry.is_live(now));

        while entries.len() >= max {
            let soonest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.eviction_rank())
                .map(|(key, _)| key.clone());
            match soonest {
                Some(key) => {
                    debug!(key = %key, "Evicting cache entry");
                    entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it unless a fresh write raced in.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        None
    }

    fn put(&self, key: String, value: Value, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(max) = self.max_entries {
            if max == 0 {
                return;
            }
            if !entries.contains_key(&key) {
                Self::make_room(&mut entries, max, now);
            }
        }

        entries.insert(
            key,
            Entry {
                value,
                expires_at: now.checked_add(ttl),
            },
        );
    }
}
