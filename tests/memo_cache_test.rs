//! Tests for [`MemoCache`]: memoized dispatch over an injectable store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use leafmend::cache::{CacheKey, CacheStore, Fingerprint, HashMapStore, MemoCache};
use leafmend::{LeafmendError, Result};

async fn counted(calls: &AtomicUsize, value: &str) -> Result<String> {
    calls.fetch_add(1, Ordering::SeqCst);
    Ok(value.to_string())
}

// =========================================================================
// Fingerprints
// =========================================================================

#[test]
fn fingerprint_same_bytes_same_key() {
    let bytes = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";
    assert_eq!(Fingerprint::of_bytes(bytes), Fingerprint::of_bytes(bytes));
}

#[test]
fn fingerprint_distinct_corpus() {
    let corpus: Vec<Vec<u8>> = (0u8..32).map(|i| vec![i; 64]).collect();
    let mut keys: Vec<String> = corpus
        .iter()
        .map(|bytes| Fingerprint::of_bytes(bytes).to_string())
        .collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), corpus.len());
}

// =========================================================================
// get_or_compute
// =========================================================================

#[tokio::test]
async fn hit_avoids_recomputation() {
    let cache = MemoCache::new();
    let calls = AtomicUsize::new(0);
    let key = CacheKey::image(Fingerprint::of_bytes(b"leaf"));

    let first = cache
        .get_or_compute(key.clone(), || counted(&calls, "Apple___Black_rot"))
        .await
        .unwrap();
    let second = cache
        .get_or_compute(key.clone(), || counted(&calls, "Apple___Black_rot"))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn miss_computes_and_stores() {
    let cache = MemoCache::new();
    let calls = AtomicUsize::new(0);
    let key = CacheKey::label("Squash___Powdery_mildew");

    assert!(cache.get(&key).is_none());
    let value = cache
        .get_or_compute(key.clone(), || counted(&calls, "sulfur spray"))
        .await
        .unwrap();
    assert_eq!(value, "sulfur spray");
    assert_eq!(cache.get(&key).as_deref(), Some("sulfur spray"));

    // Different producer output is ignored on a hit
    let again = cache
        .get_or_compute(key, || counted(&calls, "something else"))
        .await
        .unwrap();
    assert_eq!(again, "sulfur spray");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn first_success_wins_over_store_race() {
    // Another writer fills the store between the miss and the insert;
    // the stored value is returned instead of the freshly computed one.
    let store = Arc::new(HashMapStore::new());
    let cache = MemoCache::with_store(store.clone());
    let key = CacheKey::label("Cherry___healthy");

    let value = cache
        .get_or_compute(key.clone(), || {
            let store = Arc::clone(&store);
            let key = key.clone();
            async move {
                store.insert_if_absent(key, "from elsewhere".into());
                Ok("computed".to_string())
            }
        })
        .await
        .unwrap();

    assert_eq!(value, "from elsewhere");
    assert_eq!(store.get(&key).as_deref(), Some("from elsewhere"));
}

#[tokio::test]
async fn errors_propagate_and_are_not_stored() {
    let cache = MemoCache::new();
    let key = CacheKey::label("Potato___Late_blight");

    let err = cache
        .get_or_compute(key.clone(), || async {
            Err::<String, _>(LeafmendError::Api {
                status: 429,
                message: "Rate limit exceeded".into(),
            })
        })
        .await
        .unwrap_err();

    assert!(matches!(err, LeafmendError::Api { status: 429, .. }));
    assert!(cache.get(&key).is_none());
    assert_eq!(cache.len(), 0);
}

#[tokio::test]
async fn image_and_label_keys_are_separate() {
    let cache = MemoCache::new();
    let fp = Fingerprint::of_bytes(b"same");

    cache
        .get_or_compute(CacheKey::image(fp.clone()), || async {
            Ok("label".to_string())
        })
        .await
        .unwrap();
    let advice = cache
        .get_or_compute(CacheKey::label(fp.as_str()), || async {
            Ok("advice".to_string())
        })
        .await
        .unwrap();

    assert_eq!(advice, "advice");
    assert_eq!(cache.len(), 2);
}

// =========================================================================
// Metrics
// =========================================================================

/// Runs async cache operations within a local recorder scope.
///
/// Uses `block_in_place` + `block_on` to keep `with_local_recorder` on the
/// same thread (it's a thread-local recorder).
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn metrics_with_recorder() {
    use metrics_util::MetricKind;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let cache = MemoCache::new();
                let key = CacheKey::label("Tomato___Leaf_Mold");

                // Failure, then miss + success, then hit
                let _ = cache
                    .get_or_compute(key.clone(), || async {
                        Err::<String, _>(LeafmendError::Http("timeout".into()))
                    })
                    .await;
                cache
                    .get_or_compute(key.clone(), || async { Ok("ventilate".to_string()) })
                    .await
                    .unwrap();
                cache
                    .get_or_compute(key, || async { Ok("ventilate".to_string()) })
                    .await
                    .unwrap();
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();
    let counter = |name: &str| -> u64 {
        snapshot
            .iter()
            .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
            .map(|(_, _, _, val)| match val {
                DebugValue::Counter(c) => *c,
                _ => 0,
            })
            .sum()
    };

    assert_eq!(counter(leafmend::telemetry::CACHE_MISSES_TOTAL), 2);
    assert_eq!(counter(leafmend::telemetry::CACHE_HITS_TOTAL), 1);
    assert_eq!(counter(leafmend::telemetry::PRODUCER_FAILURES_TOTAL), 1);
}
