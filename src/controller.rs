use std::collections::BTreeSet;

use chat_provider::{ChatProvider, ChatReply, ChatRequest, Message, ProviderError, Role};
use conversation_store::{ConversationId, ConversationStore, IdGenerator, KeyValueMedium};
use thiserror::Error;

use crate::auth::AuthGate;
use crate::context::context_window;
use crate::session::{ConversationSession, PersistError, SessionError};
use crate::title::{self, TitleRequest};

pub type TurnId = u64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("authentication is required before sending")]
    AuthRequired,

    #[error("a send is already in flight")]
    Busy,

    #[error("prompt must not be empty")]
    EmptyPrompt,
}

#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("no stored conversation with id {0}")]
    UnknownConversation(ConversationId),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// One issued turn, ready to be sent to the chat collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub turn_id: TurnId,
    pub request: ChatRequest,
}

/// Result of completing a turn, for the UI to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The assistant replied; a title upgrade may be wanted for the first
    /// exchange of a conversation.
    Replied {
        title_request: Option<TitleRequest>,
    },
    /// Transport/server or validation failure, surfaced inline on the turn
    /// that triggered it. Never retried automatically.
    Failed { message: String },
    /// The held credential was rejected; the gate is collecting a new one.
    SessionExpired,
}

/// Tracks which conversation issued the outstanding turn. The issuer starts
/// as the active session (possibly without an id yet) and is pinned to a
/// stored id when the user navigates away before completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlightTurn {
    turn_id: TurnId,
    issuer: Option<ConversationId>,
    issuer_is_active: bool,
}

/// Owns the active session, the bounded store, and the auth gate, and drives
/// each user turn through explicit begin/complete phases.
///
/// Single logical actor: no queue, no cancellation. A second send while one
/// is outstanding is refused synchronously; an outstanding turn runs to
/// completion and its result is applied even if the user has since navigated
/// to a different conversation, while the busy flag always clears.
pub struct ChatController<M: KeyValueMedium> {
    auth: AuthGate<M>,
    store: ConversationStore<M>,
    session: ConversationSession,
    ids: IdGenerator,
    in_flight: Option<InFlightTurn>,
    next_turn_id: TurnId,
    selected_model: String,
    known_models: Vec<String>,
    // Conversations whose title was already model-generated; a stored title
    // alone cannot tell generated apart from heuristic.
    generated_titles: BTreeSet<ConversationId>,
}

impl<M: KeyValueMedium> ChatController<M> {
    #[must_use]
    pub fn new(store: ConversationStore<M>, auth: AuthGate<M>, model: impl Into<String>) -> Self {
        let selected_model = model.into();
        Self {
            auth,
            store,
            session: ConversationSession::new(selected_model.clone()),
            ids: IdGenerator::new(),
            in_flight: None,
            next_turn_id: 0,
            selected_model,
            known_models: Vec::new(),
            generated_titles: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    #[must_use]
    pub fn store(&self) -> &ConversationStore<M> {
        &self.store
    }

    #[must_use]
    pub fn auth(&self) -> &AuthGate<M> {
        &self.auth
    }

    pub fn auth_mut(&mut self) -> &mut AuthGate<M> {
        &mut self.auth
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Model bound to sessions created from now on.
    pub fn select_model(&mut self, model: impl Into<String>) {
        self.selected_model = model.into();
    }

    /// Records the last fetched model list. Informational only: a session
    /// whose bound model has since vanished still sends, with a warning.
    pub fn note_available_models(&mut self, models: Vec<String>) {
        self.known_models = models;
    }

    /// Starts one user turn: appends the user message, derives the context
    /// window, and marks the controller busy.
    ///
    /// Refused synchronously when the gate blocks backend operations, when a
    /// turn is already outstanding, or when the prompt is empty or
    /// whitespace-only (validation, local, no network call).
    pub fn begin_turn(&mut self, prompt: &str) -> Result<TurnRequest, TurnError> {
        if !self.auth.allows_session_ops() {
            return Err(TurnError::AuthRequired);
        }
        if self.in_flight.is_some() {
            return Err(TurnError::Busy);
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(TurnError::EmptyPrompt);
        }

        if !self.known_models.is_empty()
            && !self.known_models.iter().any(|m| m == self.session.model())
        {
            tracing::warn!(model = self.session.model(), "bound model is not in the last fetched model list");
        }

        self.session.append_message(Role::User, prompt);
        let context = context_window(self.session.messages()).to_vec();

        self.next_turn_id += 1;
        let turn_id = self.next_turn_id;
        self.in_flight = Some(InFlightTurn {
            turn_id,
            issuer: self.session.id(),
            issuer_is_active: true,
        });

        Ok(TurnRequest {
            turn_id,
            request: ChatRequest {
                prompt: prompt.to_string(),
                model: self.session.model().to_string(),
                context,
            },
        })
    }

    /// Applies the collaborator's result for an issued turn.
    ///
    /// Always clears the busy flag, whatever conversation is now active. The
    /// reply lands on the conversation that issued the turn: on the session
    /// when it is still active, otherwise directly on the stored record.
    pub fn complete_turn(
        &mut self,
        turn_id: TurnId,
        result: Result<ChatReply, ProviderError>,
    ) -> TurnOutcome {
        let turn = match self.in_flight.take() {
            Some(turn) if turn.turn_id == turn_id => turn,
            other => {
                tracing::warn!(turn_id, "completion for an unknown turn");
                self.in_flight = other;
                return TurnOutcome::Failed {
                    message: "stale turn completion".to_string(),
                };
            }
        };

        match result {
            Ok(reply) => self.apply_reply(turn, reply),
            Err(error) if error.is_credential_rejection() => {
                self.auth.on_credential_rejected();
                TurnOutcome::SessionExpired
            }
            Err(error) => TurnOutcome::Failed {
                message: error.to_string(),
            },
        }
    }

    fn apply_reply(&mut self, turn: InFlightTurn, reply: ChatReply) -> TurnOutcome {
        // The issuing conversation may have become active again since the
        // turn was pinned; route by identity so the reply lands on the live
        // session and is not erased by its next persist.
        let issuer_is_active = turn.issuer_is_active
            || (turn.issuer.is_some() && turn.issuer == self.session.id());
        if issuer_is_active {
            self.session.append_message(Role::Assistant, reply.response);
            let first_exchange = self.session.messages().len() == 2;

            if let Err(error) = self.session.persist(&mut self.store, &mut self.ids) {
                tracing::warn!(%error, "turn applied in memory but not yet durable");
            }

            let title_request = match (first_exchange, self.session.id()) {
                (true, Some(id)) => self.session.messages().first().map(|first| TitleRequest {
                    conversation_id: id,
                    model: self.session.model().to_string(),
                    first_prompt: first.content.clone(),
                }),
                _ => None,
            };

            return TurnOutcome::Replied { title_request };
        }

        // The user navigated away while the turn was outstanding; the result
        // still belongs to the issuing conversation.
        let Some(id) = turn.issuer else {
            tracing::debug!("issuing conversation was never persisted, dropping reply");
            return TurnOutcome::Replied {
                title_request: None,
            };
        };

        match self.store.get(id) {
            Some(record) => {
                let mut record = record.clone();
                record.messages.push(Message::assistant(reply.response));
                let first_exchange = record.messages.len() == 2;
                let title_request = match (first_exchange, record.messages.first()) {
                    (true, Some(first)) => Some(TitleRequest {
                        conversation_id: id,
                        model: record.model.clone(),
                        first_prompt: first.content.clone(),
                    }),
                    _ => None,
                };

                if let Err(error) = self.store.upsert(record) {
                    tracing::warn!(%error, "reply applied in memory but not yet durable");
                }
                TurnOutcome::Replied { title_request }
            }
            None => {
                tracing::debug!(%id, "issuing conversation evicted before completion");
                TurnOutcome::Replied {
                    title_request: None,
                }
            }
        }
    }

    /// Applies an asynchronously resolved title, or keeps the heuristic one
    /// when the resolver came back empty-handed.
    ///
    /// Lands on the issuing conversation even after navigation; a title never
    /// reverts and never downgrades a different generated title.
    pub fn complete_title_upgrade(&mut self, conversation_id: ConversationId, title: Option<String>) {
        let Some(title) = title else {
            tracing::debug!(%conversation_id, "keeping heuristic title");
            return;
        };

        if self.session.id() == Some(conversation_id) {
            match self.session.set_generated_title(title) {
                Ok(true) => {
                    self.generated_titles.insert(conversation_id);
                    if let Err(error) = self.session.persist(&mut self.store, &mut self.ids) {
                        tracing::warn!(%error, "upgraded title not yet durable");
                    }
                }
                Ok(false) => {
                    self.generated_titles.insert(conversation_id);
                }
                Err(error) => tracing::debug!(%error, "title upgrade not applied"),
            }
            return;
        }

        if let Some(record) = self.store.get(conversation_id) {
            if self.generated_titles.contains(&conversation_id) {
                if record.title.as_deref() != Some(title.as_str()) {
                    tracing::debug!(%conversation_id, "a generated title is already set, not replacing");
                }
                return;
            }

            let mut record = record.clone();
            record.title = Some(title);
            if let Err(error) = self.store.upsert(record) {
                tracing::warn!(%error, "upgraded title not yet durable");
            }
            self.generated_titles.insert(conversation_id);
        }
    }

    /// Persists the outgoing session (when it has messages) and starts a
    /// fresh empty one bound to the currently selected model.
    pub fn new_conversation(&mut self) -> Result<(), PersistError> {
        self.session.persist(&mut self.store, &mut self.ids)?;
        self.detach_in_flight();
        self.session = ConversationSession::new(self.selected_model.clone());
        Ok(())
    }

    /// Switches the active session to a stored conversation, persisting the
    /// outgoing one first. A persistence failure aborts the switch so no
    /// unsaved turn is silently lost.
    pub fn switch_to(&mut self, id: ConversationId) -> Result<(), SwitchError> {
        let record = self
            .store
            .get(id)
            .cloned()
            .ok_or(SwitchError::UnknownConversation(id))?;

        self.session.persist(&mut self.store, &mut self.ids)?;
        self.detach_in_flight();
        self.session.switch_to(&record)?;
        Ok(())
    }

    /// Pins the outstanding turn (if any) to the stored identity of the
    /// session it was issued on, so its result can still land after the
    /// active session changes.
    fn detach_in_flight(&mut self) {
        if let Some(turn) = self.in_flight.as_mut() {
            if turn.issuer_is_active {
                turn.issuer = self.session.id();
                turn.issuer_is_active = false;
            }
        }
    }

    /// Convenience composition of one full turn: begin, await the chat
    /// collaborator, complete, and run the title upgrade when one is wanted.
    pub async fn send(
        &mut self,
        provider: &dyn ChatProvider,
        prompt: &str,
    ) -> Result<TurnOutcome, TurnError> {
        let turn = self.begin_turn(prompt)?;
        let credential = self.auth.credential().map(str::to_string);
        let result = provider.chat(turn.request, credential.as_deref()).await;
        let outcome = self.complete_turn(turn.turn_id, result);

        if let TurnOutcome::Replied {
            title_request: Some(request),
        } = &outcome
        {
            let title = title::request_title(provider, request, credential.as_deref()).await;
            self.complete_title_upgrade(request.conversation_id, title);
        }

        Ok(outcome)
    }
}
