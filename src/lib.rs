//! AI Chat API
//!
//! A backend proxy that accepts chat messages over HTTP and forwards them to
//! one of several configurable LLM providers, normalizing requests and
//! responses into a single API shape.
//!
//! ## Module Structure
//!
//! - `types`: Wire-level data model (messages, requests, responses)
//! - `config`: Environment-driven settings, validated at startup
//! - `provider`: Upstream LLM provider client (OpenAI, Anthropic, OpenRouter)
//! - `service`: Chat dispatch service
//! - `server`: HTTP endpoint layer

/// Wire-level data model
pub mod types;

/// Environment-driven configuration
pub mod config;

/// Upstream LLM provider client
pub mod provider;

/// Chat dispatch service
pub mod service;

/// HTTP endpoint layer
pub mod server;
