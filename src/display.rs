//! Rendering results as user-facing text.
//!
//! The library reports failures as [`LeafmendError`]; this is the one place
//! they become strings. Front ends call [`render`] and show the result
//! verbatim.

use crate::{LeafmendError, Result};

/// Shown when no classifier model is available.
pub const MODEL_NOT_LOADED: &str = "Model not loaded.";

/// Shown when the model produced no scores.
pub const NO_PREDICTION: &str = "No prediction.";

/// Text for a failure.
pub fn render_error(err: &LeafmendError) -> String {
    match err {
        LeafmendError::ModelNotLoaded => MODEL_NOT_LOADED.to_string(),
        LeafmendError::EmptyPrediction => NO_PREDICTION.to_string(),
        LeafmendError::Api { message, .. } => format!("API Error: {message}"),
        other => format!("Exception: {other}"),
    }
}

/// Text for a result: the value itself, or the rendered failure.
pub fn render(result: &Result<String>) -> String {
    match result {
        Ok(text) => text.clone(),
        Err(err) => render_error(err),
    }
}
