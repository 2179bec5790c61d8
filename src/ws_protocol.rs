//! Real-time channel envelope: JSON text frames tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::models::Message;

/// Frames a client may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Identity announcement. `token` is only checked when the server verifies handshakes.
    Auth {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(default)]
        token: Option<String>,
    },
}

/// Frames the server pushes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent<'a> {
    NewMessage { message: &'a Message },
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("auth frame carries an empty userId")]
    EmptyUserId,
}

/// Decode and validate one inbound text frame. Unknown `type` tags are `Malformed`.
pub fn parse_client_event(text: &str) -> Result<ClientEvent, ProtocolError> {
    let event: ClientEvent = serde_json::from_str(text)?;
    let ClientEvent::Auth { user_id, .. } = &event;
    if user_id.trim().is_empty() {
        return Err(ProtocolError::EmptyUserId);
    }
    Ok(event)
}

impl ServerEvent<'_> {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn parses_auth() {
        let ev = parse_client_event(r#"{"type":"auth","userId":"u1"}"#).unwrap();
        assert_eq!(
            ev,
            ClientEvent::Auth {
                user_id: "u1".into(),
                token: None
            }
        );
    }

    #[test]
    fn parses_auth_with_token() {
        let ev = parse_client_event(r#"{"type":"auth","userId":"u1","token":"abc"}"#).unwrap();
        assert!(matches!(ev, ClientEvent::Auth { token: Some(ref t), .. } if t == "abc"));
    }

    #[test]
    fn rejects_missing_or_blank_user_id() {
        assert!(matches!(
            parse_client_event(r#"{"type":"auth"}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            parse_client_event(r#"{"type":"auth","userId":"  "}"#),
            Err(ProtocolError::EmptyUserId)
        ));
        assert!(matches!(
            parse_client_event(r#"{"type":"auth","userId":42}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_unknown_type_and_garbage() {
        assert!(parse_client_event(r#"{"type":"new_message","message":{}}"#).is_err());
        assert!(parse_client_event(r#"{"type":"ping"}"#).is_err());
        assert!(parse_client_event("not json").is_err());
        assert!(parse_client_event(r#"{"userId":"u1"}"#).is_err());
    }

    #[test]
    fn new_message_envelope_shape() {
        let m = Message {
            id: Uuid::new_v4(),
            sender_id: "u1".into(),
            receiver_id: "u2".into(),
            content: "hi".into(),
            read: false,
            created_at: Utc::now(),
        };
        let json = ServerEvent::NewMessage { message: &m }.to_json().unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["type"], "new_message");
        assert_eq!(v["message"]["id"], m.id.to_string());
        assert_eq!(v["message"]["senderId"], "u1");
        assert_eq!(v["message"]["receiverId"], "u2");
        assert_eq!(v["message"]["content"], "hi");
    }
}
