use crate::error::StoreError;
use crate::medium::KeyValueMedium;
use crate::record::{ConversationId, ConversationRecord};

/// Maximum number of persisted conversations; the tail is dropped on overflow.
pub const CONVERSATION_CAP: usize = 50;

/// Medium key holding the serialized conversation list.
pub const CONVERSATIONS_KEY: &str = "conversations";

/// Bounded, durable collection of conversation records.
///
/// Records are kept most-recent-first by last write: a new record is inserted
/// at the front, while upserting an existing id replaces it in place without
/// moving it. In-memory state is authoritative; a failed write leaves it
/// applied and reports the operation as not yet durable.
pub struct ConversationStore<M: KeyValueMedium> {
    medium: M,
    records: Vec<ConversationRecord>,
}

impl<M: KeyValueMedium> ConversationStore<M> {
    /// Opens the store, loading whatever the medium holds.
    ///
    /// A corrupt or unreadable payload never propagates: the store opens
    /// empty and the recoverable error is returned alongside for logging.
    pub fn open(medium: M) -> (Self, Option<StoreError>) {
        match load_records(&medium) {
            Ok(records) => (Self { medium, records }, None),
            Err(error) => {
                tracing::warn!(%error, "conversation store unreadable, starting empty");
                (
                    Self {
                        medium,
                        records: Vec::new(),
                    },
                    Some(error),
                )
            }
        }
    }

    /// Returns all records, most-recent-first by last write.
    #[must_use]
    pub fn records(&self) -> &[ConversationRecord] {
        &self.records
    }

    #[must_use]
    pub fn get(&self, id: ConversationId) -> Option<&ConversationRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Inserts or replaces a record, then writes through to the medium.
    ///
    /// An existing id is replaced in place; a new record lands at the front
    /// and the tail is dropped until the cap holds.
    pub fn upsert(&mut self, record: ConversationRecord) -> Result<(), StoreError> {
        match self.records.iter().position(|existing| existing.id == record.id) {
            Some(index) => self.records[index] = record,
            None => {
                self.records.insert(0, record);
                self.records.truncate(CONVERSATION_CAP);
            }
        }

        self.write_through()
    }

    /// Removes a record by id; removing an unknown id is a no-op.
    pub fn remove(&mut self, id: ConversationId) -> Result<(), StoreError> {
        let before = self.records.len();
        self.records.retain(|record| record.id != id);
        if self.records.len() == before {
            return Ok(());
        }

        self.write_through()
    }

    fn write_through(&mut self) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&self.records)
            .map_err(|source| StoreError::Serialize { source })?;
        self.medium
            .set(CONVERSATIONS_KEY, &payload)
            .map_err(|source| {
                let error = StoreError::Write { source };
                tracing::warn!(%error, "conversation write not yet durable");
                error
            })
    }
}

fn load_records<M: KeyValueMedium>(medium: &M) -> Result<Vec<ConversationRecord>, StoreError> {
    let Some(payload) = medium
        .get(CONVERSATIONS_KEY)
        .map_err(|source| StoreError::Load { source })?
    else {
        return Ok(Vec::new());
    };

    serde_json::from_str(&payload).map_err(|source| StoreError::Corrupt { source })
}
