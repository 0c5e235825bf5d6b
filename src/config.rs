//! Configuration loading.
//!
//! Configuration is loaded from TOML with the following resolution order:
//! 1. `--config <path>` (CLI flag; must exist)
//! 2. `~/.leafmend/config.toml` (user)
//! 3. `/etc/leafmend/config.toml` (system)
//! 4. built-in defaults
//!
//! The API key is loaded separately with mandatory permission checks:
//! 1. `~/.leafmend/secrets.toml` (user, must be 0600)
//! 2. `/etc/leafmend/secrets.toml` (system, must be 0600)
//! 3. `OPENROUTER_API_KEY` environment variable

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::classify::preprocess::DEFAULT_INPUT_SIZE;
use crate::recommend::client::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT};
use crate::{LeafmendError, Result};

/// Environment variable consulted when no secrets file carries a key.
pub const API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub recommendation: RecommendationConfig,
}

/// Classifier model configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// ONNX model file (default: trained_model/plant_disease_prediction_model.onnx).
    #[serde(default = "default_weights_path")]
    pub weights_path: PathBuf,
    /// JSON class-index file (default: class_indices.json).
    #[serde(default = "default_class_indices_path")]
    pub class_indices_path: PathBuf,
    /// Square input edge in pixels (default: 128).
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    /// Name of the model's image input (default: input_1).
    #[serde(default = "default_input_name")]
    pub input_name: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            weights_path: default_weights_path(),
            class_indices_path: default_class_indices_path(),
            input_size: default_input_size(),
            input_name: default_input_name(),
        }
    }
}

fn default_weights_path() -> PathBuf {
    PathBuf::from("trained_model").join("plant_disease_prediction_model.onnx")
}

fn default_class_indices_path() -> PathBuf {
    PathBuf::from("class_indices.json")
}

fn default_input_size() -> u32 {
    DEFAULT_INPUT_SIZE
}

fn default_input_name() -> String {
    "input_1".to_string()
}

/// Chat-completion endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationConfig {
    /// Endpoint base URL (default: https://openrouter.ai/api/v1).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier (default: openai/gpt-4o-mini).
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Probe the endpoint at startup (default: true).
    #[serde(default = "default_warm_up")]
    pub warm_up: bool,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            warm_up: default_warm_up(),
        }
    }
}

impl RecommendationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_warm_up() -> bool {
    true
}

/// Secrets (API key).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub openrouter: Option<ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

impl Config {
    /// Load configuration from the standard locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            LeafmendError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            LeafmendError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.recommendation.timeout_secs == 0 {
            return Err(LeafmendError::Configuration(format!(
                "{path:?}: recommendation.timeout_secs must be at least 1"
            )));
        }
        if self.model.input_size == 0 {
            return Err(LeafmendError::Configuration(format!(
                "{path:?}: model.input_size must be at least 1"
            )));
        }
        Ok(())
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(LeafmendError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".leafmend").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/leafmend/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Returns empty secrets if no file exists (the env var may still
    /// supply a key).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".leafmend").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/leafmend/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Load secrets from a specific file, enforcing permissions.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            LeafmendError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            LeafmendError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Reject secrets files readable by group or others.
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            LeafmendError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(LeafmendError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// The API key, falling back to `OPENROUTER_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        self.openrouter
            .as_ref()
            .map(|s| s.api_key.clone())
            .or_else(|| std::env::var(API_KEY_ENV_VAR).ok())
    }
}
