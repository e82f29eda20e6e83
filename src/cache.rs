//! Bounded time-to-live cache for provider responses
//!
//! Entries are immutable once written. An entry older than the TTL is never
//! returned; when the map is full the least recently used entry is dropped.

use crate::config::CacheConfig;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    inserted: Instant,
    last_used: u64,
}

struct CacheState<K, V> {
    entries: HashMap<K, Entry<V>>,
    tick: u64,
}

/// Size- and time-bounded map shared between requests
pub struct TtlCache<K, V> {
    state: Mutex<CacheState<K, V>>,
    ttl: Duration,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                tick: 0,
            }),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn from_config(cfg: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(cfg.ttl_secs), cfg.capacity)
    }

    /// Fresh value for `key`, if any
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState<K, V>> {
        // Entries are whole values, a panic mid-update cannot leave one half-written
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let mut state = self.lock();
        let expired = match state.entries.get(key) {
            None => return None,
            Some(entry) => now.duration_since(entry.inserted) >= self.ttl,
        };
        if expired {
            state.entries.remove(key);
            return None;
        }
        state.tick += 1;
        let tick = state.tick;
        state.entries.get_mut(key).map(|entry| {
            entry.last_used = tick;
            entry.value.clone()
        })
    }

    fn insert_at(&self, key: K, value: V, now: Instant) {
        let mut state = self.lock();
        let ttl = self.ttl;
        state
            .entries
            .retain(|_, e| now.duration_since(e.inserted) < ttl);

        if !state.entries.contains_key(&key) && state.entries.len() >= self.capacity {
            let victim = state
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                state.entries.remove(&victim);
            }
        }

        state.tick += 1;
        let tick = state.tick;
        state.entries.insert(
            key,
            Entry {
                value,
                inserted: now,
                last_used: tick,
            },
        );
    }
}
