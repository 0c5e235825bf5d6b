//! Caching subsystem.
//!
//! - [`Fingerprint`] / [`CacheKey`] - deterministic keys. Images are keyed by
//!   a SHA-256 digest of their pixels; recommendations by the disease label
//!   itself.
//!
//! - [`CacheStore`] - injectable mapping with an insert-if-absent primitive.
//!   [`MokaStore`] is the default; [`HashMapStore`] is a plain locked map.
//!
//! - [`MemoCache`] - the dispatcher: look up, otherwise compute once and
//!   store on success.
//!
//! Entries are never evicted. The cache grows for as long as it lives, which
//! for the CLI is one process.

pub mod fingerprint;
pub mod memo;
pub mod store;

pub use fingerprint::{CacheKey, Fingerprint};
pub use memo::MemoCache;
pub use store::{CacheStore, HashMapStore, MokaStore};
