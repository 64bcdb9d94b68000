use chat_provider::{Message, Role};
use conversation_store::{
    ConversationId, ConversationRecord, ConversationStore, IdGenerator, KeyValueMedium, StoreError,
};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::title::heuristic_title;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a model-generated title is already set")]
    TitleAlreadyGenerated,

    #[error("session has unsaved messages; persist before switching")]
    UnsavedMessages,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to format creation timestamp as RFC3339: {0}")]
    ClockFormat(#[source] time::error::Format),
}

/// Title lifecycle: never reverts, and a generated title can only be
/// re-set with the same text.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TitleState {
    Unset,
    Heuristic(String),
    Generated(String),
}

impl TitleState {
    fn text(&self) -> Option<&str> {
        match self {
            Self::Unset => None,
            Self::Heuristic(text) | Self::Generated(text) => Some(text),
        }
    }
}

/// The single active, mutable conversation.
///
/// Moves `Empty → Active` on the first appended message and to `Persisted`
/// once durably written; the id and creation timestamp are assigned exactly
/// once. Exactly one session exists at a time and it is owned by the
/// controller, which forces persistence before replacing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSession {
    id: Option<ConversationId>,
    messages: Vec<Message>,
    title: TitleState,
    model: String,
    created_at: OffsetDateTime,
    saved_len: usize,
}

impl ConversationSession {
    /// Fresh `Empty` session bound to the given model; `created_at` is
    /// stamped now, not at first message.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: None,
            messages: Vec::new(),
            title: TitleState::Unset,
            model: model.into(),
            created_at: OffsetDateTime::now_utc(),
            saved_len: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<ConversationId> {
        self.id
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.text()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Messages appended since the last successful persist.
    #[must_use]
    pub fn has_unsaved_messages(&self) -> bool {
        self.messages.len() > self.saved_len
    }

    /// Appends one message; always succeeds, moving `Empty → Active` on the
    /// first call.
    pub fn append_message(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message {
            role,
            content: content.into(),
        });
    }

    /// Replaces a missing or heuristic title with a model-generated one.
    ///
    /// Returns `Ok(true)` when the title changed, `Ok(false)` when the same
    /// generated title was already set (idempotent re-apply), and an error
    /// when a different generated title is already in place.
    pub fn set_generated_title(&mut self, text: impl Into<String>) -> Result<bool, SessionError> {
        let text = text.into();
        match &self.title {
            TitleState::Generated(existing) if *existing == text => Ok(false),
            TitleState::Generated(_) => Err(SessionError::TitleAlreadyGenerated),
            TitleState::Unset | TitleState::Heuristic(_) => {
                self.title = TitleState::Generated(text);
                Ok(true)
            }
        }
    }

    /// Writes the session through to the store.
    ///
    /// Assigns the id on first persistence only, fills in the heuristic title
    /// when none is set, and performs no write at all with zero messages.
    /// Returns whether a write happened. A write failure leaves the session
    /// unchanged except that an id assigned here is kept (assignment happens
    /// once, at first persistence, durable or not).
    pub fn persist<M: KeyValueMedium>(
        &mut self,
        store: &mut ConversationStore<M>,
        ids: &mut IdGenerator,
    ) -> Result<bool, PersistError> {
        if self.messages.is_empty() {
            return Ok(false);
        }

        let id = match self.id {
            Some(id) => id,
            None => {
                let id = ids.next_id();
                self.id = Some(id);
                id
            }
        };

        if matches!(self.title, TitleState::Unset) {
            self.title = TitleState::Heuristic(heuristic_title(&self.messages));
        }

        let created_at = self
            .created_at
            .format(&Rfc3339)
            .map_err(PersistError::ClockFormat)?;
        store.upsert(ConversationRecord {
            id,
            messages: self.messages.clone(),
            title: self.title.text().map(str::to_string),
            model: self.model.clone(),
            created_at,
        })?;

        self.saved_len = self.messages.len();
        Ok(true)
    }

    /// Replaces this session with a stored conversation.
    ///
    /// Refused while unsaved messages exist; callers persist first. This is
    /// the invariant preventing silent loss of unsaved turns when navigating
    /// between conversations.
    pub fn switch_to(&mut self, record: &ConversationRecord) -> Result<(), SessionError> {
        if self.has_unsaved_messages() {
            return Err(SessionError::UnsavedMessages);
        }

        let created_at = match OffsetDateTime::parse(&record.created_at, &Rfc3339) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::warn!(%error, id = %record.id, "stored created_at unreadable, re-stamping");
                OffsetDateTime::now_utc()
            }
        };

        self.id = Some(record.id);
        self.messages = record.messages.clone();
        // A stored title is treated as heuristic so a late-arriving generated
        // title may still replace it.
        self.title = match &record.title {
            Some(text) => TitleState::Heuristic(text.clone()),
            None => TitleState::Unset,
        };
        self.model = record.model.clone();
        self.created_at = created_at;
        self.saved_len = self.messages.len();
        Ok(())
    }
}
