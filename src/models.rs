use crate::schema;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A persisted direct message. Serialized with camelCase keys, which is what clients read
/// both from the REST API and from `new_message` push events.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize, ToSchema)]
#[diesel(table_name = schema::messages)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// For inserting a message. Set `id` and `created_at` (e.g. `Utc::now()`) when not relying on DB defaults.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::messages)]
pub struct NewMessage {
    pub id: Uuid,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl NewMessage {
    pub fn unread(sender_id: String, receiver_id: String, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            content,
            read: false,
            created_at: Utc::now(),
        }
    }
}

impl From<NewMessage> for Message {
    fn from(m: NewMessage) -> Self {
        Message {
            id: m.id,
            sender_id: m.sender_id,
            receiver_id: m.receiver_id,
            content: m.content,
            read: m.read,
            created_at: m.created_at,
        }
    }
}

/// One row of the conversation list: the other participant, the newest message, unread count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub partner_id: String,
    pub last_message: Message,
    pub unread_count: i64,
}

/// Group messages (newest first) involving `user_id` into per-partner summaries,
/// ordered by each conversation's newest message.
pub fn summarize_conversations(user_id: &str, newest_first: &[Message]) -> Vec<ConversationSummary> {
    let mut summaries: Vec<ConversationSummary> = Vec::new();
    let mut index = std::collections::HashMap::new();
    for m in newest_first {
        let partner = if m.sender_id == user_id {
            &m.receiver_id
        } else {
            &m.sender_id
        };
        let slot = *index.entry(partner.clone()).or_insert_with(|| {
            summaries.push(ConversationSummary {
                partner_id: partner.clone(),
                last_message: m.clone(),
                unread_count: 0,
            });
            summaries.len() - 1
        });
        if m.receiver_id == user_id && m.sender_id != user_id && !m.read {
            summaries[slot].unread_count += 1;
        }
    }
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn msg(from: &str, to: &str, content: &str, read: bool, age_secs: i64) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: from.into(),
            receiver_id: to.into(),
            content: content.into(),
            read,
            created_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    #[test]
    fn summaries_group_by_partner_and_count_unread() {
        let newest_first = vec![
            msg("u2", "u1", "latest from u2", false, 1),
            msg("u1", "u3", "to u3", false, 2),
            msg("u2", "u1", "older from u2", false, 3),
            msg("u3", "u1", "read one", true, 4),
            msg("u1", "u2", "mine", false, 5),
        ];
        let s = summarize_conversations("u1", &newest_first);
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].partner_id, "u2");
        assert_eq!(s[0].last_message.content, "latest from u2");
        assert_eq!(s[0].unread_count, 2);
        assert_eq!(s[1].partner_id, "u3");
        assert_eq!(s[1].last_message.content, "to u3");
        assert_eq!(s[1].unread_count, 0);
    }

    #[test]
    fn message_json_uses_camel_case() {
        let m = msg("u1", "u2", "hi", false, 0);
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["senderId"], "u1");
        assert_eq!(v["receiverId"], "u2");
        assert_eq!(v["content"], "hi");
        assert!(v.get("createdAt").is_some());
    }
}
