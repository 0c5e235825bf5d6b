//! Leafmend - plant leaf diagnosis with memoized model and LLM calls
//!
//! A leaf photo is classified into a disease label by an image model, and a
//! chat-completion endpoint is asked how to treat it. Both calls are
//! expensive and unreliable, so both sit behind one [`MemoCache`]: images
//! are keyed by a digest of their pixels, recommendations by the label.
//! Only successful results are cached.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use leafmend::{Advisor, ChatCompletionClient, MemoCache};
//!
//! #[tokio::main]
//! async fn main() -> leafmend::Result<()> {
//!     let cache = Arc::new(MemoCache::new());
//!     let client = ChatCompletionClient::new("sk-or-your-key")?;
//!     let advisor = Advisor::new(Arc::new(client), cache);
//!
//!     let advice = advisor.recommend("Tomato___Late_blight").await?;
//!     println!("{advice}");
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod classify;
pub mod config;
pub mod diagnose;
pub mod display;
pub mod error;
pub mod recommend;
pub mod telemetry;
mod version;

// Re-export main types at crate root
pub use cache::{CacheKey, CacheStore, Fingerprint, HashMapStore, MemoCache, MokaStore};
pub use classify::{ClassIndex, ImageClassifier, PixelTensor, PlantClassifier, Preprocessor};
pub use config::{Config, Secrets};
pub use diagnose::{Diagnoser, Diagnosis};
pub use error::{ClassIndexError, LeafmendError, Result};
pub use recommend::{Advisor, ChatCompletionClient, TextGenerator, recommendation_prompt};
pub use version::{PKG_VERSION, version_string};
