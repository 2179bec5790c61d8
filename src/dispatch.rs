//! Best-effort push of freshly persisted messages to the recipient's live connection.

use std::sync::Arc;

use crate::metrics::Metrics;
use crate::models::Message;
use crate::ws_protocol::ServerEvent;
use crate::ws_registry::ConnectionRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Queued on the recipient's connection.
    Delivered,
    /// Recipient has no identified connection.
    Absent,
    /// Recipient was registered but the push failed (socket gone or queue full).
    Dropped,
}

impl DeliveryOutcome {
    fn label(self) -> &'static str {
        match self {
            DeliveryOutcome::Delivered => "delivered",
            DeliveryOutcome::Absent => "absent",
            DeliveryOutcome::Dropped => "dropped",
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>, metrics: Arc<Metrics>) -> Self {
        Self { registry, metrics }
    }

    /// Call once per message, after its write has committed. Never waits and never fails;
    /// the outcome is informational. One attempt only: there is no de-duplication key,
    /// so a retry could show the recipient the same message twice.
    pub fn dispatch(&self, message: &Message) -> DeliveryOutcome {
        let outcome = self.try_deliver(message);
        self.metrics
            .ws_dispatch
            .with_label_values(&[outcome.label()])
            .inc();
        outcome
    }

    fn try_deliver(&self, message: &Message) -> DeliveryOutcome {
        let Some(conn) = self.registry.lookup(&message.receiver_id) else {
            tracing::trace!(receiver_id = %message.receiver_id, message_id = %message.id, "recipient offline");
            return DeliveryOutcome::Absent;
        };
        let json = match (ServerEvent::NewMessage { message }).to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("serialize new_message event: {:?}", e);
                return DeliveryOutcome::Dropped;
            }
        };
        match conn.push(json) {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(e) => {
                tracing::debug!(
                    receiver_id = %message.receiver_id,
                    conn_id = conn.conn_id,
                    error = %e,
                    "ws push failed, dropping event"
                );
                DeliveryOutcome::Dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws_registry::ConnectionHandle;
    use chrono::Utc;
    use uuid::Uuid;

    fn setup() -> (Arc<ConnectionRegistry>, Dispatcher) {
        let registry = Arc::new(ConnectionRegistry::new());
        let metrics = Arc::new(Metrics::new().unwrap());
        let dispatcher = Dispatcher::new(registry.clone(), metrics);
        (registry, dispatcher)
    }

    fn message_to(receiver: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: "u1".into(),
            receiver_id: receiver.into(),
            content: "hi".into(),
            read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn absent_recipient_is_silent() {
        let (registry, dispatcher) = setup();
        let (other, mut rx) = ConnectionHandle::open(4);
        registry.register("u3", other);

        assert_eq!(dispatcher.dispatch(&message_to("u2")), DeliveryOutcome::Absent);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn present_recipient_gets_exactly_one_event() {
        let (registry, dispatcher) = setup();
        let (conn, mut rx) = ConnectionHandle::open(4);
        registry.register("u2", conn);
        let m = message_to("u2");

        assert_eq!(dispatcher.dispatch(&m), DeliveryOutcome::Delivered);

        let frame = rx.try_recv().expect("one frame queued");
        assert!(rx.try_recv().is_err());
        let v: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(v["type"], "new_message");
        let got: Message = serde_json::from_value(v["message"].clone()).unwrap();
        assert_eq!(got, m);
    }

    #[test]
    fn closed_connection_counts_as_dropped() {
        let (registry, dispatcher) = setup();
        let (conn, rx) = ConnectionHandle::open(4);
        registry.register("u2", conn);
        drop(rx);

        assert_eq!(dispatcher.dispatch(&message_to("u2")), DeliveryOutcome::Dropped);
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let (registry, dispatcher) = setup();
        let (conn, mut rx) = ConnectionHandle::open(1);
        registry.register("u2", conn);

        assert_eq!(dispatcher.dispatch(&message_to("u2")), DeliveryOutcome::Delivered);
        assert_eq!(dispatcher.dispatch(&message_to("u2")), DeliveryOutcome::Dropped);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn outcomes_are_counted() {
        let (registry, dispatcher) = setup();
        let (conn, _rx) = ConnectionHandle::open(4);
        registry.register("u2", conn);
        dispatcher.dispatch(&message_to("u2"));
        dispatcher.dispatch(&message_to("nobody"));

        let text = dispatcher.metrics.render().unwrap();
        assert!(text.contains(r#"ws_dispatch_total{outcome="delivered"} 1"#));
        assert!(text.contains(r#"ws_dispatch_total{outcome="absent"} 1"#));
    }
}
