use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use super::{MessageStore, StoreError};
use crate::models::{summarize_conversations, ConversationSummary, Message, NewMessage};
use crate::schema::messages;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn connect(database_url: &str) -> Result<Self, StoreError> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder().build(manager)?;
        Ok(Self { pool })
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        let conn = &mut self.pool.get()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        for version in applied {
            tracing::info!(%version, "applied migration");
        }
        Ok(())
    }
}

impl MessageStore for PgMessageStore {
    fn create_message(&self, new: NewMessage) -> Result<Message, StoreError> {
        let conn = &mut self.pool.get()?;
        let stored = diesel::insert_into(messages::table)
            .values(&new)
            .returning(Message::as_returning())
            .get_result(conn)?;
        Ok(stored)
    }

    fn conversation(&self, user_a: &str, user_b: &str) -> Result<Vec<Message>, StoreError> {
        use crate::schema::messages::dsl;
        let conn = &mut self.pool.get()?;
        let rows = messages::table
            .filter(
                (dsl::sender_id.eq(user_a).and(dsl::receiver_id.eq(user_b)))
                    .or(dsl::sender_id.eq(user_b).and(dsl::receiver_id.eq(user_a))),
            )
            .order((dsl::created_at.asc(), dsl::id.asc()))
            .select(Message::as_select())
            .load(conn)?;
        Ok(rows)
    }

    fn mark_read(&self, receiver_id: &str, sender_id: &str) -> Result<usize, StoreError> {
        use crate::schema::messages::dsl;
        let conn = &mut self.pool.get()?;
        let updated = diesel::update(
            messages::table.filter(
                dsl::receiver_id
                    .eq(receiver_id)
                    .and(dsl::sender_id.eq(sender_id))
                    .and(dsl::read.eq(false)),
            ),
        )
        .set(dsl::read.eq(true))
        .execute(conn)?;
        Ok(updated)
    }

    fn conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>, StoreError> {
        use crate::schema::messages::dsl;
        let conn = &mut self.pool.get()?;
        let rows: Vec<Message> = messages::table
            .filter(dsl::sender_id.eq(user_id).or(dsl::receiver_id.eq(user_id)))
            .order((dsl::created_at.desc(), dsl::id.desc()))
            .select(Message::as_select())
            .load(conn)?;
        Ok(summarize_conversations(user_id, &rows))
    }
}

#[cfg(test)]
mod tests {
    const CREATE_MESSAGES: &str = include_str!("../../migrations/2025-01-01-000000_create_messages/up.sql");

    #[test]
    fn participant_ids_are_unbounded() {
        for column in ["sender_id TEXT NOT NULL", "receiver_id TEXT NOT NULL"] {
            assert!(CREATE_MESSAGES.contains(column), "missing `{column}`");
        }
        assert!(!CREATE_MESSAGES.to_ascii_uppercase().contains("VARCHAR("));
    }
}
