//! Storage backends for the memo cache.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{PoisonError, RwLock};

use super::CacheKey;

/// Mapping abstraction behind [`MemoCache`](super::MemoCache).
///
/// Implementations must never overwrite an existing entry: the first value
/// stored under a key is the value every later reader sees.
pub trait CacheStore: Send + Sync {
    /// Look up a stored value.
    fn get(&self, key: &CacheKey) -> Option<String>;

    /// Store `value` unless `key` is already present.
    ///
    /// Returns the value that ends up stored under `key`, which is the
    /// existing one when the key was already taken.
    fn insert_if_absent(&self, key: CacheKey, value: String) -> String;

    /// Number of stored entries.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Default store: an unbounded moka cache.
///
/// No capacity and no TTL, so entries live as long as the store.
pub struct MokaStore {
    entries: moka::sync::Cache<CacheKey, String>,
}

impl MokaStore {
    pub fn new() -> Self {
        Self {
            entries: moka::sync::Cache::builder().build(),
        }
    }
}

impl Default for MokaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MokaStore {
    fn get(&self, key: &CacheKey) -> Option<String> {
        self.entries.get(key)
    }

    fn insert_if_absent(&self, key: CacheKey, value: String) -> String {
        self.entries.entry(key).or_insert(value).into_value()
    }

    fn len(&self) -> u64 {
        // entry_count is eventually consistent until pending tasks run
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }
}

/// Plain `RwLock<HashMap>` store.
#[derive(Default)]
pub struct HashMapStore {
    entries: RwLock<HashMap<CacheKey, String>>,
}

impl HashMapStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for HashMapStore {
    fn get(&self, key: &CacheKey) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn insert_if_absent(&self, key: CacheKey, value: String) -> String {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.entry(key) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => slot.insert(value).clone(),
        }
    }

    fn len(&self) -> u64 {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len() as u64
    }
}
