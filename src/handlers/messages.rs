use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::models::{ConversationSummary, Message, NewMessage};
use crate::store::{MessageStore, StoreError};
use crate::utils::auth::CurrentUid;
use crate::AppState;

type ApiError = (StatusCode, &'static str);

/// Run a store call off the async workers. Failures are logged with `context` and become a 500.
async fn with_store<T, F>(state: &AppState, context: &'static str, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn MessageStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| {
            tracing::error!("{}: store task failed: {:?}", context, e);
            (StatusCode::INTERNAL_SERVER_ERROR, context)
        })?
        .map_err(|e| {
            tracing::error!("{}: {:?}", context, e);
            (StatusCode::INTERNAL_SERVER_ERROR, context)
        })
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageBody {
    receiver_id: String,
    content: String,
}

/// POST /api/messages: Persist a direct message, then push it to the recipient if online.
#[utoipa::path(
    post,
    path = "/api/messages",
    request_body = CreateMessageBody,
    responses(
        (status = 200, description = "Message stored", body = Message),
        (status = 400, description = "Blank receiver or content"),
        (status = 401, description = "Missing or invalid bearer token"),
    )
)]
pub async fn post_message(
    CurrentUid(uid): CurrentUid,
    State(state): State<AppState>,
    Json(body): Json<CreateMessageBody>,
) -> Result<Json<Message>, ApiError> {
    let receiver_id = body.receiver_id.trim().to_owned();
    if receiver_id.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "receiverId is required"));
    }
    if body.content.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message cannot be empty"));
    }

    let new_msg = NewMessage::unread(uid, receiver_id, body.content);
    let message = with_store(&state, "Failed to send message", move |store| {
        store.create_message(new_msg)
    })
    .await?;
    state.metrics.messages_created.inc();

    // Only after the write has committed.
    state.dispatcher.dispatch(&message);

    Ok(Json(message))
}

/// GET /api/messages/{user_id}: Conversation with `user_id`, oldest first. Marks their messages to the caller as read.
#[utoipa::path(
    get,
    path = "/api/messages/{user_id}",
    params(("user_id" = String, Path, description = "Conversation partner")),
    responses(
        (status = 200, description = "Conversation", body = [Message]),
        (status = 401, description = "Missing or invalid bearer token"),
    )
)]
pub async fn get_messages(
    CurrentUid(uid): CurrentUid,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = with_store(&state, "Failed to fetch messages", move |store| {
        let rows = store.conversation(&uid, &user_id)?;
        store.mark_read(&uid, &user_id)?;
        Ok(rows)
    })
    .await?;
    Ok(Json(messages))
}

/// GET /api/conversations: Conversation partners, most recent first.
#[utoipa::path(
    get,
    path = "/api/conversations",
    responses(
        (status = 200, description = "Conversation list", body = [ConversationSummary]),
        (status = 401, description = "Missing or invalid bearer token"),
    )
)]
pub async fn get_conversations(
    CurrentUid(uid): CurrentUid,
    State(state): State<AppState>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    let conversations = with_store(&state, "Failed to fetch conversations", move |store| {
        store.conversations(&uid)
    })
    .await?;
    Ok(Json(conversations))
}
