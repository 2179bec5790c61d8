use std::sync::Mutex;

use super::{MessageStore, StoreError};
use crate::models::{summarize_conversations, ConversationSummary, Message, NewMessage};

/// Process-local store for development without Postgres, and for tests. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryMessageStore {
    messages: Mutex<Vec<Message>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn between(m: &Message, a: &str, b: &str) -> bool {
    (m.sender_id == a && m.receiver_id == b) || (m.sender_id == b && m.receiver_id == a)
}

impl MessageStore for MemoryMessageStore {
    fn create_message(&self, new: NewMessage) -> Result<Message, StoreError> {
        let message = Message::from(new);
        self.messages
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .push(message.clone());
        Ok(message)
    }

    fn conversation(&self, user_a: &str, user_b: &str) -> Result<Vec<Message>, StoreError> {
        let guard = self.messages.lock().map_err(|_| StoreError::Poisoned)?;
        let mut rows: Vec<Message> = guard
            .iter()
            .filter(|m| between(m, user_a, user_b))
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.created_at);
        Ok(rows)
    }

    fn mark_read(&self, receiver_id: &str, sender_id: &str) -> Result<usize, StoreError> {
        let mut guard = self.messages.lock().map_err(|_| StoreError::Poisoned)?;
        let mut updated = 0;
        for m in guard
            .iter_mut()
            .filter(|m| m.receiver_id == receiver_id && m.sender_id == sender_id && !m.read)
        {
            m.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    fn conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>, StoreError> {
        let guard = self.messages.lock().map_err(|_| StoreError::Poisoned)?;
        let mut rows: Vec<Message> = guard
            .iter()
            .filter(|m| m.sender_id == user_id || m.receiver_id == user_id)
            .cloned()
            .collect();
        drop(guard);
        // Insertion order breaks ties, so reverse before a stable sort on time.
        rows.reverse();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summarize_conversations(user_id, &rows))
    }
}
