use std::fmt;

use chat_provider::Message;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Conversation identifier: unix epoch milliseconds at first persistence.
///
/// Only uniqueness and creation-order comparability matter; see
/// [`IdGenerator`] for the collision rule.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConversationId(i64);

impl ConversationId {
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub fn as_millis(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mints unique, creation-order-comparable conversation ids.
///
/// Ids are taken from the wall clock; a second id minted within the same
/// millisecond gets `last + 1` so uniqueness holds even under a coarse or
/// stalled clock.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ConversationId {
        let now = unix_millis_now();
        let id = if now > self.last { now } else { self.last + 1 };
        self.last = id;
        ConversationId(id)
    }
}

fn unix_millis_now() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}

/// The persisted unit: one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationRecord {
    pub id: ConversationId,
    pub messages: Vec<Message>,
    pub title: Option<String>,
    pub model: String,
    pub created_at: String,
}
