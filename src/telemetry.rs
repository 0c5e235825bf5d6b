//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (e.g. prometheus,
//! statsd); without a recorder installed, all metric calls are no-ops.
//!
//! All metrics are prefixed with `leafmend_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `kind` - cache key namespace: "image" or "label"

/// Total memo cache hits.
///
/// Labels: `kind`.
pub const CACHE_HITS_TOTAL: &str = "leafmend_cache_hits_total";

/// Total memo cache misses (producer invoked).
///
/// Labels: `kind`.
pub const CACHE_MISSES_TOTAL: &str = "leafmend_cache_misses_total";

/// Total producer failures. Failed results are never cached.
///
/// Labels: `kind`.
pub const PRODUCER_FAILURES_TOTAL: &str = "leafmend_producer_failures_total";
