mod error;
mod medium;
mod record;
mod store;

pub use error::{MediumError, StoreError};
pub use medium::{sanitize_key_for_filename, FileMedium, KeyValueMedium, MemoryMedium};
pub use record::{ConversationId, ConversationRecord, IdGenerator};
pub use store::{ConversationStore, CONVERSATIONS_KEY, CONVERSATION_CAP};
