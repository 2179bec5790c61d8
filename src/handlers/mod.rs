pub mod messages;
pub mod ws;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;

use crate::AppState;

pub async fn health() -> &'static str {
    "ok"
}

/// GET /metrics: Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, (StatusCode, &'static str)> {
    state.metrics.ws_connections.set(state.ws_registry.len() as i64);
    let body = state.metrics.render().map_err(|e| {
        tracing::error!("render metrics: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render metrics")
    })?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
