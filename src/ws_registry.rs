//! WebSocket connection registry: maps a user id to its single live connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Handle to one open socket: the sender that feeds the socket task's outbound queue.
#[derive(Debug)]
pub struct ConnectionHandle {
    pub conn_id: u64,
    tx: mpsc::Sender<String>,
}

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(0);

fn next_conn_id() -> u64 {
    NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed)
}

impl ConnectionHandle {
    /// Create a handle and the receiver its socket task drains. `buffer` bounds queued frames.
    pub fn open(buffer: usize) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let handle = Arc::new(Self {
            conn_id: next_conn_id(),
            tx,
        });
        (handle, rx)
    }

    /// Queue a text frame without waiting. Fails if the socket task is gone or the queue is full.
    pub fn push(&self, text: String) -> Result<(), mpsc::error::TrySendError<String>> {
        self.tx.try_send(text)
    }
}

/// Registry of identified connections, keyed by application user id. Shared via Arc.
pub struct ConnectionRegistry {
    /// user id -> current connection (last registered wins).
    by_user: dashmap::DashMap<String, Arc<ConnectionHandle>>,
    /// conn_id -> user id it is registered under, so removal never needs a scan.
    by_conn: dashmap::DashMap<u64, String>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            by_user: dashmap::DashMap::new(),
            by_conn: dashmap::DashMap::new(),
        }
    }

    /// Associate `user_id` with `conn`, replacing any previous connection for that user.
    /// The replaced connection is not closed; its own close later unregisters nothing.
    /// Returns the replaced connection, if any.
    pub fn register(&self, user_id: &str, conn: Arc<ConnectionHandle>) -> Option<Arc<ConnectionHandle>> {
        let conn_id = conn.conn_id;
        if let Some(previous_uid) = self.by_conn.insert(conn_id, user_id.to_owned()) {
            if previous_uid != user_id {
                self.by_user
                    .remove_if(&previous_uid, |_, e| e.conn_id == conn_id);
            }
        }
        let replaced = self.by_user.insert(user_id.to_owned(), conn);
        match replaced {
            Some(old) if old.conn_id != conn_id => {
                self.by_conn.remove_if(&old.conn_id, |_, uid| uid.as_str() == user_id);
                tracing::debug!(user_id, old_conn_id = old.conn_id, conn_id, "ws registration replaced");
                Some(old)
            }
            _ => None,
        }
    }

    /// Remove the entry that points at exactly this connection. No-op if it was replaced or never registered.
    pub fn unregister(&self, conn: &ConnectionHandle) -> bool {
        let conn_id = conn.conn_id;
        let Some((_, user_id)) = self.by_conn.remove(&conn_id) else {
            return false;
        };
        self.by_user
            .remove_if(&user_id, |_, e| e.conn_id == conn_id)
            .is_some()
    }

    /// Current connection for `user_id`, if that user is reachable for push.
    pub fn lookup(&self, user_id: &str) -> Option<Arc<ConnectionHandle>> {
        self.by_user.get(user_id).map(|e| e.value().clone())
    }

    /// Number of users currently reachable for push.
    pub fn len(&self) -> usize {
        self.by_user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
