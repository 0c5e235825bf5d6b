//! Leafmend error types

use std::path::PathBuf;

/// Leafmend error types
#[derive(Debug, thiserror::Error)]
pub enum LeafmendError {
    // Remote endpoint errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// The endpoint answered with a JSON error payload or a JSON body under a
    /// non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The body was not JSON or lacked the reply text.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    // Classifier errors
    #[error("model not loaded")]
    ModelNotLoaded,

    #[error("model returned no prediction")]
    EmptyPrediction,

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("class index error: {0}")]
    ClassIndex(#[from] ClassIndexError),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl LeafmendError {
    /// Whether the failure happened while talking to the remote endpoint.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            LeafmendError::Http(_) | LeafmendError::Api { .. } | LeafmendError::MalformedResponse(_)
        )
    }
}

/// Named load errors for the class-index table.
#[derive(Debug, thiserror::Error)]
pub enum ClassIndexError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("class index is not a JSON object of strings: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("class index key {0:?} is not a non-negative integer")]
    InvalidIndex(String),

    #[error("class index {0} appears more than once")]
    DuplicateIndex(u32),

    #[error("class index for {0:?} has an empty label")]
    EmptyLabel(String),

    #[error("class index is empty")]
    Empty,
}

/// Result type alias for Leafmend operations
pub type Result<T> = std::result::Result<T, LeafmendError>;
