//! Local leaf classification via ONNX Runtime.
//!
//! Expects a model exported with a single NHWC float input of shape
//! `[1, size, size, 3]` and a `[1, classes]` probability output.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;
use tracing::info;

use super::{ImageClassifier, PixelTensor};
use crate::{LeafmendError, Result};

/// Default name of the model's image input.
pub const DEFAULT_INPUT_NAME: &str = "input_1";

/// ONNX Runtime image classifier.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    name: String,
}

impl OnnxClassifier {
    /// Load a model from disk.
    pub fn load(model_path: &Path, input_name: impl Into<String>) -> Result<Self> {
        let session = build_session(model_path)?;
        let name = model_name(model_path);
        info!(model = %name, path = ?model_path, "loaded ONNX classifier");

        Ok(Self {
            session: Mutex::new(session),
            input_name: input_name.into(),
            name,
        })
    }
}

#[async_trait]
impl ImageClassifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn predict(&self, input: &PixelTensor) -> Result<Vec<f32>> {
        let tensor = TensorRef::from_array_view((input.shape(), input.as_slice()))
            .map_err(|e| LeafmendError::Inference(format!("Failed to create input tensor: {e}")))?;

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| LeafmendError::Inference(format!("ONNX inference failed: {e}")))?;

        // try_extract_tensor returns (&Shape, &[T]); batch of one, so the data is the row
        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| LeafmendError::Inference(format!("Failed to extract scores: {e}")))?;
        let scores = scores.to_vec();

        Ok(scores)
    }
}

fn build_session(model_path: &Path) -> Result<Session> {
    Session::builder()
        .map_err(|e| {
            LeafmendError::Configuration(format!("Failed to create session builder: {e}"))
        })?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| {
            LeafmendError::Configuration(format!("Failed to set optimization level: {e}"))
        })?
        .commit_from_file(model_path)
        .map_err(|e| LeafmendError::Configuration(format!("Failed to load ONNX model: {e}")))
}

fn model_name(model_path: &Path) -> String {
    model_path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "onnx".to_string())
}
