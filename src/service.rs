//! Chat dispatch service.
//!
//! Owns the single "generate a reply" operation: merge prior turns with the
//! new user message, invoke the configured provider, and return a normalized
//! result. No conversation state is kept between calls; the only continuity
//! is the caller-supplied history.

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::provider::{ProviderClient, UpstreamError};
use crate::types::ChatMessage;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("failed to generate response")]
    Generation(#[source] UpstreamError),
    #[error("chat task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Normalized reply from the dispatch service.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub content: String,
    pub conversation_id: String,
    pub model_used: String,
}

#[derive(Debug, Clone)]
pub struct ChatService {
    provider: ProviderClient,
}

impl ChatService {
    pub fn new(provider: ProviderClient) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &ProviderClient {
        &self.provider
    }

    /// Generate a reply to `user_message` given the prior turns.
    ///
    /// The outbound list is `previous_messages` in the given order followed
    /// by the new user turn; the full history is always forwarded, with no
    /// truncation or token budgeting. A fresh conversation id is minted on
    /// every call.
    ///
    /// The upstream call runs on its own task: if the inbound connection is
    /// dropped and this future is cancelled, the call still runs to
    /// completion and its result is discarded.
    pub async fn respond(
        &self,
        user_message: &str,
        previous_messages: &[ChatMessage],
    ) -> Result<ChatReply, ChatError> {
        let conversation_id = Uuid::new_v4().to_string();

        let mut messages = Vec::with_capacity(previous_messages.len() + 1);
        messages.extend_from_slice(previous_messages);
        messages.push(ChatMessage::user(user_message));

        debug!(
            "dispatching conversation {} with {} messages",
            conversation_id,
            messages.len()
        );

        let provider = self.provider.clone();
        let content = tokio::spawn(async move { provider.generate(&messages).await })
            .await?
            .map_err(ChatError::Generation)?;

        Ok(ChatReply {
            content,
            conversation_id,
            model_used: self.provider.model().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderSettings;
    use crate::provider::ProviderKind;
    use httpmock::prelude::*;

    fn service(server: &MockServer) -> ChatService {
        let provider_settings = ProviderSettings {
            api_key: "sk-test".to_string(),
            model: "test-model".to_string(),
            ..Default::default()
        };
        let client = ProviderClient::new(ProviderKind::OpenAi, &provider_settings)
            .unwrap()
            .with_endpoint(server.url("/v1/chat/completions"));
        ChatService::new(client)
    }

    #[tokio::test]
    async fn test_respond_forwards_history_in_order() {
        let server = MockServer::start();

        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions").json_body_partial(
                r#"{
                    "messages": [
                        {"role": "user", "content": "A"},
                        {"role": "assistant", "content": "B"},
                        {"role": "user", "content": "C"}
                    ]
                }"#,
            );
            then.status(200).json_body(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "D"}}]
            }));
        });

        let service = service(&server);
        let history = vec![ChatMessage::user("A"), ChatMessage::assistant("B")];
        let reply = service.respond("C", &history).await.unwrap();

        assert_eq!(reply.content, "D");
        assert_eq!(reply.model_used, "test-model");
        mock.assert();
    }

    #[tokio::test]
    async fn test_respond_mints_fresh_conversation_ids() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "ok"}}]
            }));
        });

        let service = service(&server);
        let first = service.respond("hi", &[]).await.unwrap();
        let second = service.respond("hi", &[]).await.unwrap();

        assert!(!first.conversation_id.is_empty());
        assert_ne!(first.conversation_id, second.conversation_id);
    }

    #[tokio::test]
    async fn test_respond_wraps_upstream_error() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(502).body("bad gateway");
        });

        let service = service(&server);
        let err = service.respond("hi", &[]).await.unwrap_err();

        assert!(matches!(
            err,
            ChatError::Generation(UpstreamError::Status { .. })
        ));
    }
}
