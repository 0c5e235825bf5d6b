//! End-to-end diagnosis: image to label to recommendation.

use std::sync::Arc;

use tracing::{error, info};

use crate::cache::MemoCache;
use crate::classify::{ClassIndex, PlantClassifier, Preprocessor};
use crate::config::{Config, ModelConfig, Secrets};
use crate::display;
use crate::recommend::{Advisor, ChatCompletionClient};
use crate::{LeafmendError, Result};

/// Outcome of one diagnosis.
///
/// `recommendation` is `None` when classification failed: there is no label
/// to ask about.
#[derive(Debug)]
pub struct Diagnosis {
    pub label: Result<String>,
    pub recommendation: Option<Result<String>>,
}

impl Diagnosis {
    /// Label as display text.
    pub fn label_text(&self) -> String {
        display::render(&self.label)
    }

    /// Recommendation as display text, if one was requested.
    pub fn recommendation_text(&self) -> Option<String> {
        self.recommendation.as_ref().map(display::render)
    }
}

/// Classifier and advisor sharing one memo cache.
pub struct Diagnoser {
    classifier: PlantClassifier,
    advisor: Advisor,
}

impl Diagnoser {
    pub fn new(classifier: PlantClassifier, advisor: Advisor) -> Self {
        Self {
            classifier,
            advisor,
        }
    }

    /// Build from configuration.
    ///
    /// A classifier that fails to load degrades to the disabled state rather
    /// than failing the build. A missing API key is an error.
    pub async fn from_config(config: &Config, secrets: &Secrets) -> Result<Self> {
        let cache = Arc::new(MemoCache::new());

        let api_key = secrets.api_key().ok_or_else(|| {
            LeafmendError::Configuration(format!(
                "no API key: set {} or add [openrouter] api_key to secrets.toml",
                crate::config::API_KEY_ENV_VAR
            ))
        })?;
        let client = ChatCompletionClient::with_base_url(api_key, &config.recommendation.base_url)?
            .model(&config.recommendation.model)
            .timeout(config.recommendation.timeout());
        if config.recommendation.warm_up {
            client.warm_up().await;
        }

        let classifier = load_classifier(&config.model, Arc::clone(&cache));
        let advisor = Advisor::new(Arc::new(client), cache);
        Ok(Self::new(classifier, advisor))
    }

    pub fn classifier(&self) -> &PlantClassifier {
        &self.classifier
    }

    pub fn advisor(&self) -> &Advisor {
        &self.advisor
    }

    /// Classify an image and, if that succeeds, fetch advice for its label.
    pub async fn diagnose(&self, image_bytes: &[u8]) -> Diagnosis {
        let label = self.classifier.classify(image_bytes).await;
        let recommendation = match &label {
            Ok(label) => Some(self.advisor.recommend(label).await),
            Err(_) => None,
        };
        Diagnosis {
            label,
            recommendation,
        }
    }
}

/// Load the class index and model named by `config`.
///
/// Any load failure is logged and yields a disabled classifier.
pub fn load_classifier(config: &ModelConfig, cache: Arc<MemoCache>) -> PlantClassifier {
    let class_index = match ClassIndex::load(&config.class_indices_path) {
        Ok(index) => index,
        Err(err) => {
            error!(error = %err, "class index failed to load, classification disabled");
            return PlantClassifier::disabled(cache);
        }
    };

    match load_backend(config) {
        Ok(backend) => {
            info!(classes = class_index.len(), "classifier ready");
            PlantClassifier::new(backend, class_index, cache)
                .with_preprocessor(Preprocessor::new(config.input_size))
        }
        Err(err) => {
            error!(error = %err, "model failed to load, classification disabled");
            PlantClassifier::disabled(cache)
        }
    }
}

#[cfg(feature = "local-inference")]
fn load_backend(config: &ModelConfig) -> Result<Arc<dyn crate::classify::ImageClassifier>> {
    let classifier =
        crate::classify::OnnxClassifier::load(&config.weights_path, config.input_name.clone())?;
    Ok(Arc::new(classifier))
}

#[cfg(not(feature = "local-inference"))]
fn load_backend(config: &ModelConfig) -> Result<Arc<dyn crate::classify::ImageClassifier>> {
    tracing::warn!(path = ?config.weights_path, "built without local-inference, no model backend");
    Err(LeafmendError::ModelNotLoaded)
}
