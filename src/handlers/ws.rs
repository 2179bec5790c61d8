//! WebSocket handler: connections start anonymous, become addressable after an `auth` frame,
//! and leave the registry on close or error.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use crate::utils::auth::HandshakePolicy;
use crate::ws_protocol::{parse_client_event, ClientEvent};
use crate::ws_registry::{ConnectionHandle, ConnectionRegistry};
use crate::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Identified(String),
    Closed,
}

/// Per-socket lifecycle. Owns the registry side effects so they happen exactly where the
/// state changes; dropping a session closes it.
pub struct Session {
    handle: Arc<ConnectionHandle>,
    registry: Arc<ConnectionRegistry>,
    policy: HandshakePolicy,
    state: ConnectionState,
}

impl Session {
    pub fn open(handle: Arc<ConnectionHandle>, registry: Arc<ConnectionRegistry>, policy: HandshakePolicy) -> Self {
        trace!(conn_id = handle.conn_id, "ws connection opened");
        Self {
            handle,
            registry,
            policy,
            state: ConnectionState::Connecting,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn conn_id(&self) -> u64 {
        self.handle.conn_id
    }

    /// Handle one inbound text frame. Bad frames are logged and ignored; they never close the socket.
    pub fn on_text(&mut self, text: &str) {
        if self.state == ConnectionState::Closed {
            return;
        }
        match parse_client_event(text) {
            Ok(ClientEvent::Auth { user_id, token }) => {
                if !self.policy.accepts(&user_id, token.as_deref()) {
                    warn!(conn_id = self.handle.conn_id, %user_id, "ws auth rejected");
                    return;
                }
                self.identify(user_id);
            }
            Err(e) => {
                warn!(conn_id = self.handle.conn_id, error = %e, "ignoring ws frame");
            }
        }
    }

    fn identify(&mut self, user_id: String) {
        self.registry.register(&user_id, self.handle.clone());
        info!(conn_id = self.handle.conn_id, %user_id, "ws user identified");
        self.state = ConnectionState::Identified(user_id);
    }

    /// Transport closed or errored. Safe to call more than once.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.registry.unregister(&self.handle);
        if let ConnectionState::Identified(user_id) = &self.state {
            info!(conn_id = self.handle.conn_id, %user_id, "ws user disconnected");
        }
        self.state = ConnectionState::Closed;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

/// GET /ws: Upgrade to a WebSocket. Identity is announced afterwards with an `auth` frame.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let registry = state.ws_registry.clone();
    let policy = state.handshake_policy.clone();
    let buffer = state.ws_send_buffer;
    ws.on_upgrade(move |socket| handle_socket(socket, registry, policy, buffer))
}

async fn handle_socket(
    mut socket: WebSocket,
    registry: Arc<ConnectionRegistry>,
    policy: HandshakePolicy,
    buffer: usize,
) {
    let (handle, mut rx) = ConnectionHandle::open(buffer);
    let mut session = Session::open(handle, registry, policy);

    loop {
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Some(text) => {
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => session.on_text(text.as_str()),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(conn_id = session.conn_id(), "ws transport error: {:?}", e);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
    session.close();
}
