//! Minimal backend-agnostic contract for the model-serving collaborator.
//!
//! This crate intentionally defines only the message value types, the chat
//! request/reply payloads, the failure taxonomy, and the async collaborator
//! trait. It excludes transport details, persistence, and session
//! orchestration concerns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Speaker of one conversation message. Insertion order is conversation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Immutable conversation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One chat-completion request sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub prompt: String,
    pub model: String,
    /// Sliding window of prior messages; empty for context-free requests.
    pub context: Vec<Message>,
}

/// Successful chat-completion reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub model: String,
}

/// Failure classes surfaced by collaborator calls.
///
/// Credential rejection is deliberately distinct from transport/server
/// failure: the auth gate reacts to the former and must never react to the
/// latter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("credential rejected: {0}")]
    CredentialRejected(String),

    #[error("request failed: {0}")]
    Transport(String),
}

impl ProviderError {
    /// Returns true when this failure means the held credential is no longer
    /// accepted, as opposed to a generic transport or server error.
    #[must_use]
    pub fn is_credential_rejection(&self) -> bool {
        matches!(self, Self::CredentialRejected(_))
    }
}

/// Async collaborator interface for the model-serving backend.
///
/// `credential` is attached to protected requests when present; callers in
/// the `Open` auth state pass `None` on every request.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Returns whether the backend requires authentication.
    ///
    /// Always reachable without a credential.
    async fn auth_required(&self) -> Result<bool, ProviderError>;

    /// Executes one chat completion.
    async fn chat(
        &self,
        request: ChatRequest,
        credential: Option<&str>,
    ) -> Result<ChatReply, ProviderError>;

    /// Lists selectable model identifiers.
    ///
    /// Protected when authentication is required, which also makes it the
    /// lightweight authorized probe for credential validation.
    async fn list_models(&self, credential: Option<&str>) -> Result<Vec<String>, ProviderError>;
}
