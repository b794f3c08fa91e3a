//! Upstream LLM provider client.
//!
//! One `ProviderClient` is built at startup from the configured provider and
//! shared by every request. All providers expose the same capability: turn an
//! ordered message list into a single generated reply. They differ in wire
//! format, authentication scheme, and where the generated text lives in the
//! response body.

use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::{ConfigError, ProviderSettings, Settings};
use crate::types::ChatMessage;

/// Sampling temperature sent with every call. Fixed policy, not configurable
/// per request.
const TEMPERATURE: f64 = 0.7;

/// Maximum output tokens requested from the upstream. Same fixed policy.
const MAX_TOKENS: u32 = 1000;

/// Request timeout for the OpenRouter call. OpenAI and Anthropic ride the
/// transport default.
const OPENROUTER_TIMEOUT_SECS: u64 = 60;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The closed set of supported providers, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    OpenRouter,
}

impl ProviderKind {
    /// Parse a provider identifier. Unrecognized values are rejected rather
    /// than defaulted; an unknown provider is a startup error.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(ProviderKind::OpenAi),
            "anthropic" => Some(ProviderKind::Anthropic),
            "openrouter" => Some(ProviderKind::OpenRouter),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenRouter => "openrouter",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::OpenRouter => "OpenRouter",
        }
    }

    /// API endpoint for this provider.
    pub fn endpoint(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1/chat/completions",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1/messages",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1/chat/completions",
        }
    }

    /// Whether this provider uses Anthropic's messages API format.
    fn is_anthropic(&self) -> bool {
        matches!(self, ProviderKind::Anthropic)
    }
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Client for the configured upstream provider.
///
/// Single attempt per call: no retry, no backoff, no batching, no streaming.
/// A non-success status, malformed body, or timeout is one `UpstreamError`.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    kind: ProviderKind,
    endpoint: String,
    api_key: String,
    model: String,
    site_url: String,
    site_name: String,
}

impl ProviderClient {
    /// Build a client for `kind`. Fails when the provider's API key is
    /// absent; this is a startup error, not a per-request one.
    pub fn new(kind: ProviderKind, settings: &ProviderSettings) -> Result<Self, ConfigError> {
        if settings.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey(
                kind.display_name(),
                kind.as_str(),
            ));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            kind,
            endpoint: kind.endpoint().to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            site_url: settings.site_url.clone(),
            site_name: settings.site_name.clone(),
        })
    }

    /// Build the client for the provider selected in `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Self::new(settings.provider, settings.active_provider())
    }

    /// Point the client at a different endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate a reply for the given message list.
    pub async fn generate(&self, messages: &[ChatMessage]) -> Result<String, UpstreamError> {
        debug!(
            "calling {} model={} messages={}",
            self.kind.as_str(),
            self.model,
            messages.len()
        );

        let response_json = if self.kind.is_anthropic() {
            self.call_anthropic(messages).await?
        } else {
            self.call_openai_compatible(messages).await?
        };

        extract_text(&response_json, self.kind)
    }

    /// OpenAI-compatible chat completions call (OpenAI, OpenRouter).
    async fn call_openai_compatible(
        &self,
        messages: &[ChatMessage],
    ) -> Result<Value, UpstreamError> {
        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });

        let mut request = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body);

        if self.kind == ProviderKind::OpenRouter {
            request = request.timeout(Duration::from_secs(OPENROUTER_TIMEOUT_SECS));
            if !self.site_url.is_empty() {
                request = request.header("HTTP-Referer", &self.site_url);
            }
            if !self.site_name.is_empty() {
                request = request.header("X-Title", &self.site_name);
            }
        }

        handle_response(request.send().await?).await
    }

    /// Anthropic messages API call.
    async fn call_anthropic(&self, messages: &[ChatMessage]) -> Result<Value, UpstreamError> {
        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        handle_response(response).await
    }
}

async fn handle_response(response: reqwest::Response) -> Result<Value, UpstreamError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(UpstreamError::Status { status, body });
    }

    response
        .json()
        .await
        .map_err(|e| UpstreamError::MalformedResponse(format!("invalid JSON: {e}")))
}

fn extract_text(response: &Value, kind: ProviderKind) -> Result<String, UpstreamError> {
    if kind.is_anthropic() {
        // Anthropic format: first text block of content[]
        let blocks = response["content"].as_array().ok_or_else(|| {
            UpstreamError::MalformedResponse("no content blocks in response".to_string())
        })?;

        for block in blocks {
            if block["type"].as_str() == Some("text") {
                if let Some(text) = block["text"].as_str() {
                    return Ok(text.to_string());
                }
            }
        }
        Err(UpstreamError::MalformedResponse(
            "no text block in response".to_string(),
        ))
    } else {
        // OpenAI format: choices[0].message.content
        response
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| {
                UpstreamError::MalformedResponse("no message content in response".to_string())
            })
    }
}
