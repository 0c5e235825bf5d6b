//! Chat-completion client for OpenRouter-compatible endpoints.
//!
//! One request per call: no retry, no backoff. Callers sit behind the memo
//! cache, so a label only reaches the endpoint again after a failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::TextGenerator;
use crate::{LeafmendError, Result};

/// Default base URL (OpenRouter).
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the startup probe.
const WARM_UP_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a chat-completion endpoint.
#[derive(Clone)]
pub struct ChatCompletionClient {
    api_key: String,
    http: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl ChatCompletionClient {
    /// Create a client for OpenRouter with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| LeafmendError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.into(),
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Set the model identifier sent with each request.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model
    }

    /// Send `prompt` as a single user message and return the reply text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self.send(prompt, self.timeout).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LeafmendError::Http(e.to_string()))?;

        parse_completion(status, &body)
    }

    /// Fire a throwaway request so connection setup (DNS, TLS) is paid at
    /// startup. Failures are logged and otherwise ignored.
    pub async fn warm_up(&self) {
        match self.send("ping", WARM_UP_TIMEOUT).await {
            Ok(response) => {
                info!(status = %response.status(), "chat endpoint warm-up complete")
            }
            Err(err) => warn!(error = %err, "chat endpoint warm-up failed"),
        }
    }

    async fn send(&self, prompt: &str, timeout: Duration) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(%url, model = %self.model, "sending chat completion");

        self.http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&ChatCompletionRequest {
                model: &self.model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
            })
            .send()
            .await
            .map_err(|e| LeafmendError::Http(e.to_string()))
    }
}

/// Map a response body to the reply text or a typed error.
///
/// An `error` object wins over everything else, including a 2xx status. A
/// body that is not JSON is a transport-level failure whatever the status.
fn parse_completion(status: StatusCode, body: &str) -> Result<String> {
    let payload: ChatCompletionResponse = serde_json::from_str(body).map_err(|e| {
        LeafmendError::MalformedResponse(format!("{status}: body is not chat-completion JSON: {e}"))
    })?;

    if let Some(error) = payload.error {
        return Err(LeafmendError::Api {
            status: status.as_u16(),
            message: error_message(&error),
        });
    }

    if !status.is_success() {
        return Err(LeafmendError::Api {
            status: status.as_u16(),
            message: format!("chat completion failed: {status}"),
        });
    }

    payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            LeafmendError::MalformedResponse("no choices[0].message.content".to_string())
        })
}

/// Extract a human-readable message from an `error` value.
fn error_message(error: &serde_json::Value) -> String {
    match error {
        serde_json::Value::String(message) => message.clone(),
        serde_json::Value::Object(fields) => match fields.get("message") {
            Some(serde_json::Value::String(message)) => message.clone(),
            _ => error.to_string(),
        },
        other => other.to_string(),
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for ChatCompletionClient {
    fn name(&self) -> &str {
        "chat-completion"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        ChatCompletionClient::complete(self, prompt).await
    }
}
