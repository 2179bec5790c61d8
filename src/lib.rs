pub mod config;
pub mod dispatch;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod openapi;
pub mod schema;
pub mod store;
pub mod utils;
pub mod ws_protocol;
pub mod ws_registry;

use axum::{
    http::HeaderName,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::metrics::Metrics;
use crate::store::MessageStore;
use crate::utils::auth::HandshakePolicy;
use crate::ws_registry::ConnectionRegistry;

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MessageStore>,
    pub ws_registry: Arc<ConnectionRegistry>,
    pub dispatcher: Dispatcher,
    pub metrics: Arc<Metrics>,
    pub jwt_secret: Arc<Vec<u8>>,
    pub handshake_policy: HandshakePolicy,
    pub ws_send_buffer: usize,
}

impl AppState {
    /// Composition root: one registry per process, shared by the socket handler and the dispatcher.
    pub fn new(config: &Config, store: Arc<dyn MessageStore>) -> Result<Self, prometheus::Error> {
        let ws_registry = Arc::new(ConnectionRegistry::new());
        let metrics = Arc::new(Metrics::new()?);
        let jwt_secret = Arc::new(config.jwt_secret.clone());
        let handshake_policy = if config.ws_verify_identity {
            HandshakePolicy::RequireToken {
                secret: jwt_secret.clone(),
            }
        } else {
            HandshakePolicy::TrustClaim
        };
        Ok(Self {
            store,
            dispatcher: Dispatcher::new(ws_registry.clone(), metrics.clone()),
            ws_registry,
            metrics,
            jwt_secret,
            handshake_policy,
            ws_send_buffer: config.ws_send_buffer,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/ws", get(handlers::ws::ws_handler))
        .route("/api/messages", post(handlers::messages::post_message))
        .route("/api/messages/{user_id}", get(handlers::messages::get_messages))
        .route("/api/conversations", get(handlers::messages::get_conversations))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
