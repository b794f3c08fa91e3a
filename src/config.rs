//! Environment-driven configuration.
//!
//! Settings are read once at process start and never mutated afterward;
//! requests share them read-only. A missing or invalid value is a fatal
//! `ConfigError` and the process refuses to come up.

use thiserror::Error;

use crate::provider::ProviderKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {value:?}")]
    InvalidVar { var: &'static str, value: String },
    #[error("unsupported LLM provider: {0}")]
    UnknownProvider(String),
    #[error("{0} API key is required when using the {1} provider")]
    MissingApiKey(&'static str, &'static str),
}

/// Per-provider configuration: API key, model identifier, and the optional
/// attribution headers OpenRouter accepts.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub api_key: String,
    pub model: String,
    pub site_url: String,
    pub site_name: String,
}

/// Application settings, process lifetime.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_prefix: String,
    pub debug: bool,
    pub project_name: String,
    pub provider: ProviderKind,
    pub openai: ProviderSettings,
    pub anthropic: ProviderSettings,
    pub openrouter: ProviderSettings,
    pub cors_origins: Vec<String>,
}

impl Settings {
    /// Read settings from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_prefix = parse_prefix(require("API_PREFIX")?)?;
        let debug = parse_bool("DEBUG", &require("DEBUG")?)?;
        let project_name = require("PROJECT_NAME")?;

        let provider_raw = require("LLM_PROVIDER")?;
        let provider = ProviderKind::parse(&provider_raw)
            .ok_or(ConfigError::UnknownProvider(provider_raw))?;

        let openai = ProviderSettings {
            api_key: env_or("OPENAI_API_KEY", ""),
            model: env_or("OPENAI_MODEL", "gpt-4-turbo"),
            ..Default::default()
        };
        let anthropic = ProviderSettings {
            api_key: env_or("ANTHROPIC_API_KEY", ""),
            model: env_or("ANTHROPIC_MODEL", "claude-3-opus-20240229"),
            ..Default::default()
        };
        let openrouter = ProviderSettings {
            api_key: env_or("OPENROUTER_API_KEY", ""),
            model: env_or("OPENROUTER_MODEL", "deepseek/deepseek-r1:free"),
            site_url: env_or("OPENROUTER_SITE_URL", ""),
            site_name: env_or("OPENROUTER_SITE_NAME", ""),
        };

        let cors_origins = parse_origins(&require("CORS_ORIGINS")?);

        Ok(Self {
            api_prefix,
            debug,
            project_name,
            provider,
            openai,
            anthropic,
            openrouter,
            cors_origins,
        })
    }

    pub fn provider_settings(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::OpenRouter => &self.openrouter,
        }
    }

    /// Settings for the configured provider.
    pub fn active_provider(&self) -> &ProviderSettings {
        self.provider_settings(self.provider)
    }
}

fn require(var: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(var)),
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidVar {
            var,
            value: value.to_string(),
        }),
    }
}

fn parse_prefix(raw: String) -> Result<String, ConfigError> {
    if !raw.starts_with('/') {
        return Err(ConfigError::InvalidVar {
            var: "API_PREFIX",
            value: raw,
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}
