//! Memoized dispatcher over a [`CacheStore`].
//!
//! [`MemoCache::get_or_compute`] returns a stored value when one exists and
//! otherwise runs the supplied producer once, storing its result only when
//! it succeeds. Failed producers leave no trace in the cache, so the next
//! call for the same key tries again.
//!
//! Concurrent callers asking for the same missing key are serialized on a
//! per-key gate with a second lookup after the gate is acquired
//! (double-checked, like lazy model loading), so an identical image
//! submitted twice at once reaches the classifier once.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use super::{CacheKey, CacheStore, MokaStore};
use crate::Result;
use crate::telemetry;

type Gate = Arc<tokio::sync::Mutex<()>>;

/// Explicit, shareable memo cache.
///
/// Entries are never evicted or expired. Share one instance between
/// services with `Arc`.
pub struct MemoCache {
    store: Arc<dyn CacheStore>,
    in_flight: Mutex<HashMap<CacheKey, Gate>>,
}

impl MemoCache {
    /// Create a cache backed by an unbounded [`MokaStore`].
    pub fn new() -> Self {
        Self::with_store(Arc::new(MokaStore::new()))
    }

    /// Create a cache over an injected store.
    pub fn with_store(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a stored value without computing anything.
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        self.store.get(key)
    }

    /// Number of stored entries.
    pub fn len(&self) -> u64 {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Return the value stored under `key`, computing it with `producer` on
    /// a miss.
    ///
    /// The producer runs at most once per call and only when the key is
    /// absent. `Ok` values are stored with insert-if-absent semantics and the
    /// stored value is returned; `Err` is returned as-is and nothing is
    /// stored.
    pub async fn get_or_compute<F, Fut>(&self, key: CacheKey, producer: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(value) = self.store.get(&key) {
            record_hit(&key);
            return Ok(value);
        }

        let entry = self.enter(&key);
        let _held = entry.gate.lock().await;

        if let Some(value) = self.store.get(&key) {
            // Another caller filled the slot while we waited.
            record_hit(&key);
            return Ok(value);
        }

        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "kind" => key.kind()).increment(1);
        debug!(%key, "cache miss, invoking producer");

        match producer().await {
            Ok(value) => Ok(self.store.insert_if_absent(key, value)),
            Err(err) => {
                metrics::counter!(telemetry::PRODUCER_FAILURES_TOTAL, "kind" => key.kind())
                    .increment(1);
                warn!(
                    %key,
                    error = %err,
                    remote = err.is_remote(),
                    "producer failed, result not cached"
                );
                Err(err)
            }
        }
    }

    /// Fetch (or create) the gate for `key`, registered until the returned
    /// entry drops.
    fn enter(&self, key: &CacheKey) -> GateEntry<'_> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let gate = Arc::clone(in_flight.entry(key.clone()).or_default());
        GateEntry {
            cache: self,
            key: key.clone(),
            gate,
        }
    }

    #[cfg(test)]
    fn gates_in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A caller's claim on a per-key gate.
///
/// Dropping it, on return or when the future is cancelled mid-wait,
/// removes the gate from the in-flight map once no other caller holds it.
struct GateEntry<'a> {
    cache: &'a MemoCache,
    key: CacheKey,
    gate: Gate,
}

impl Drop for GateEntry<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .cache
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one held here.
        let idle = Arc::strong_count(&self.gate) <= 2;
        if idle
            && in_flight
                .get(&self.key)
                .is_some_and(|registered| Arc::ptr_eq(registered, &self.gate))
        {
            in_flight.remove(&self.key);
        }
    }
}

impl Default for MemoCache {
    fn default() -> Self {
        Self::new()
    }
}

fn record_hit(key: &CacheKey) {
    metrics::counter!(telemetry::CACHE_HITS_TOTAL, "kind" => key.kind()).increment(1);
    debug!(%key, "cache hit");
}
