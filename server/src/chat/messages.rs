//! REST endpoints for conversation history, sending, and read receipts.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::auth::middleware::Claims;
use crate::chat::{delivery, store};
use crate::db::models::Message;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub text: Option<String>,
    /// Base64 or data-URI image payload
    #[serde(default)]
    pub image: Option<String>,
}

/// GET /conversation/{peer_id}
/// Full conversation with the peer, ascending creation order. A snapshot:
/// an unknown peer simply yields an empty list.
pub async fn get_conversation(
    State(state): State<AppState>,
    claims: Claims,
    Path(peer_id): Path<String>,
) -> Result<Json<Vec<Message>>, StatusCode> {
    let db = state.db.clone();
    let user_id = claims.sub;

    let messages = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        store::list_conversation(&conn, &user_id, &peer_id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(messages))
}

/// POST /messages/{peer_id}
/// Persist a message to the peer, then best-effort push it live. The
/// persisted row in the response is the authoritative confirmation.
pub async fn send_message(
    State(state): State<AppState>,
    claims: Claims,
    Path(peer_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), StatusCode> {
    let message =
        delivery::send_message(&state, claims.sub, peer_id, body.text, body.image).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// PUT /messages/{peer_id}/read
/// Bulk-mark everything the peer sent to the caller as read, then return
/// the updated conversation.
pub async fn mark_read(
    State(state): State<AppState>,
    claims: Claims,
    Path(peer_id): Path<String>,
) -> Result<Json<Vec<Message>>, StatusCode> {
    let db = state.db.clone();
    let user_id = claims.sub;

    let messages = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let updated = store::mark_read(&conn, &peer_id, &user_id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        tracing::debug!(
            reader = %user_id,
            sender = %peer_id,
            updated,
            "Marked messages read"
        );
        store::list_conversation(&conn, &user_id, &peer_id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(messages))
}
