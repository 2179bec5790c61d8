//! Message persistence. Handlers call these from `spawn_blocking`.

mod memory;
mod pg;

pub use memory::MemoryMessageStore;
pub use pg::{PgMessageStore, PgPool};

use crate::models::{ConversationSummary, Message, NewMessage};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("connection pool: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("query: {0}")]
    Query(#[from] diesel::result::Error),
    #[error("migration: {0}")]
    Migration(String),
    #[error("store lock poisoned")]
    Poisoned,
}

pub trait MessageStore: Send + Sync {
    /// Persist a message. Returns the stored record once the write has committed.
    fn create_message(&self, new: NewMessage) -> Result<Message, StoreError>;

    /// Every message exchanged between the two users, oldest first.
    fn conversation(&self, user_a: &str, user_b: &str) -> Result<Vec<Message>, StoreError>;

    /// Mark messages from `sender_id` to `receiver_id` as read. Returns the number updated.
    fn mark_read(&self, receiver_id: &str, sender_id: &str) -> Result<usize, StoreError>;

    /// One summary per conversation partner, most recently active first.
    fn conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>, StoreError>;
}
