//! Treatment and care recommendations for a disease label.
//!
//! [`Advisor`] turns a label into a prompt, asks a [`TextGenerator`] for
//! advice, and memoizes the reply under the label. Only successful replies
//! are stored; an API error or timeout is returned to the caller and the
//! next request for that label queries the endpoint again.

pub mod client;

pub use client::ChatCompletionClient;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::Result;
use crate::cache::{CacheKey, MemoCache};

/// Remote text generation: prompt in, generated text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generator name for logging/debugging.
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Whether a label names a healthy plant (case-insensitive).
pub fn is_healthy(label: &str) -> bool {
    label.to_lowercase().contains("healthy")
}

/// Build the prompt for a label.
///
/// Healthy plants get a maintenance-tips prompt; anything else a
/// treatment-and-prevention prompt.
pub fn recommendation_prompt(label: &str) -> String {
    if is_healthy(label) {
        format!("The plant is healthy ({label}). Give maintenance tips.")
    } else {
        format!("Suggest treatment and prevention for {label} in plants.")
    }
}

/// Memoized recommendation lookup.
pub struct Advisor {
    generator: Arc<dyn TextGenerator>,
    cache: Arc<MemoCache>,
}

impl Advisor {
    pub fn new(generator: Arc<dyn TextGenerator>, cache: Arc<MemoCache>) -> Self {
        Self { generator, cache }
    }

    /// Recommendation text for `label`, from cache when available.
    pub async fn recommend(&self, label: &str) -> Result<String> {
        self.cache
            .get_or_compute(CacheKey::label(label), || async {
                let prompt = recommendation_prompt(label);
                debug!(generator = self.generator.name(), %prompt, "requesting recommendation");
                self.generator.generate(&prompt).await
            })
            .await
    }
}
