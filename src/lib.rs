//! Conversation lifecycle and persistence core for a single-user chat client
//! backed by a locally hosted model server.
//!
//! The crate owns the state-transition logic of the client: the active
//! [`session::ConversationSession`], the bounded sliding
//! [`context`] window sent with each turn, heuristic and model-assisted
//! [`title`] resolution, the optional [`auth::AuthGate`], and the
//! [`controller::ChatController`] that composes them over the durable
//! conversation store.
//!
//! Rendering, model inference, and process bootstrap live outside this crate;
//! the model-serving backend is reached only through the
//! [`chat_provider::ChatProvider`] boundary.

pub mod auth;
pub mod context;
pub mod controller;
pub mod session;
pub mod title;

pub use auth::{AuthError, AuthGate, AuthState, CREDENTIAL_KEY};
pub use chat_provider::{ChatProvider, ChatReply, ChatRequest, Message, ProviderError, Role};
pub use context::{context_window, CONTEXT_MESSAGES};
pub use controller::{ChatController, SwitchError, TurnError, TurnOutcome, TurnRequest};
pub use conversation_store::{
    ConversationId, ConversationRecord, ConversationStore, FileMedium, IdGenerator,
    KeyValueMedium, MemoryMedium, StoreError,
};
pub use ollama_api::{OllamaApiClient, OllamaApiConfig};
pub use session::{ConversationSession, PersistError, SessionError};
pub use title::{heuristic_title, TitleRequest, PLACEHOLDER_TITLE, TITLE_MAX_CHARS};
