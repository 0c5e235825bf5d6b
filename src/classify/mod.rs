//! Leaf image classification.
//!
//! [`PlantClassifier`] fronts an [`ImageClassifier`] backend with the memo
//! cache: an image is decoded, fingerprinted by its pixels, and only sent to
//! the model when that fingerprint has no stored label.
//!
//! A classifier built with [`PlantClassifier::disabled`] stands in when the
//! model or class index failed to load. Every call then fails fast with
//! [`ModelNotLoaded`](crate::LeafmendError::ModelNotLoaded) without touching
//! the cache.

pub mod index;
#[cfg(feature = "local-inference")]
pub mod onnx;
pub mod preprocess;

pub use index::ClassIndex;
#[cfg(feature = "local-inference")]
pub use onnx::OnnxClassifier;
pub use preprocess::{PixelTensor, Preprocessor};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::{CacheKey, Fingerprint, MemoCache};
use crate::{LeafmendError, Result};

/// Label used when the model's top index has no entry in the class index.
pub const UNKNOWN_CLASS: &str = "Unknown class";

/// Model backend: normalized pixels in, one score per class out.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Backend name for logging/debugging.
    fn name(&self) -> &str;

    /// Score every class for a single image. An empty vector means the
    /// model produced no prediction.
    async fn predict(&self, input: &PixelTensor) -> Result<Vec<f32>>;
}

/// A loaded model together with its class index.
struct LoadedModel {
    backend: Arc<dyn ImageClassifier>,
    class_index: ClassIndex,
}

/// Memoized leaf classifier.
pub struct PlantClassifier {
    model: Option<LoadedModel>,
    preprocessor: Preprocessor,
    cache: Arc<MemoCache>,
}

impl PlantClassifier {
    /// Create a classifier over a loaded backend.
    pub fn new(
        backend: Arc<dyn ImageClassifier>,
        class_index: ClassIndex,
        cache: Arc<MemoCache>,
    ) -> Self {
        Self {
            model: Some(LoadedModel {
                backend,
                class_index,
            }),
            preprocessor: Preprocessor::default(),
            cache,
        }
    }

    /// Create a classifier with no model. Every call returns `ModelNotLoaded`.
    pub fn disabled(cache: Arc<MemoCache>) -> Self {
        Self {
            model: None,
            preprocessor: Preprocessor::default(),
            cache,
        }
    }

    /// Override the input preprocessing (e.g. a different input edge).
    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    /// Whether a model is available.
    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Classify an encoded leaf image, returning its disease label.
    ///
    /// Identical pixels are classified once; later calls are served from
    /// the cache. Nothing is cached when the model is missing, the image
    /// does not decode, or the model returns no scores.
    pub async fn classify(&self, image_bytes: &[u8]) -> Result<String> {
        let model = self.model.as_ref().ok_or(LeafmendError::ModelNotLoaded)?;

        let image = Preprocessor::decode(image_bytes)?;
        let fingerprint = Fingerprint::of_image(&image);
        debug!(%fingerprint, "classifying image");

        self.cache
            .get_or_compute(CacheKey::image(fingerprint), || async {
                let tensor = self.preprocessor.tensor(&image);
                let scores = model.backend.predict(&tensor).await?;
                let index = argmax(&scores).ok_or(LeafmendError::EmptyPrediction)?;
                let label = model.class_index.label(index).unwrap_or(UNKNOWN_CLASS);
                debug!(backend = model.backend.name(), index, label, "model prediction");
                Ok(label.to_string())
            })
            .await
    }
}

/// Index of the highest score; the first one wins ties and NaN never wins.
/// `None` when there is nothing to pick.
fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &score)| match best {
            _ if score.is_nan() => best,
            Some((_, top)) if score <= top => best,
            _ => Some((i, score)),
        })
        .map(|(i, _)| i)
}
