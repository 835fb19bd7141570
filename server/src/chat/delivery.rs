//! Delivery coordinator: the only component bridging durable state and live
//! push. A send is durably appended first; live delivery to whoever is
//! connected is a best-effort accelerant with an at-most-once, no-retry
//! guarantee, and never part of the success contract.

use axum::http::StatusCode;
use chrono::Utc;

use crate::blobs;
use crate::chat::store::{self, NewMessage};
use crate::db::models::Message;
use crate::state::AppState;
use crate::ws::protocol::ServerEvent;
use crate::ws::push;

/// Maximum message text length (chars).
const MAX_TEXT_LENGTH: usize = 4000;

/// Handle a send request end to end:
/// validate -> resolve image -> append -> best-effort push -> persisted row.
pub async fn send_message(
    state: &AppState,
    sender_id: String,
    receiver_id: String,
    text: Option<String>,
    image: Option<String>,
) -> Result<Message, StatusCode> {
    let text = text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    let image = image.filter(|i| !i.is_empty());

    // A send with neither text nor image is a caller error; nothing mutated.
    if text.is_none() && image.is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if let Some(t) = &text {
        if t.chars().count() > MAX_TEXT_LENGTH {
            return Err(StatusCode::PAYLOAD_TOO_LARGE);
        }
    }

    // Resolve the image payload to a stored reference before the append, so
    // the persisted row never points at a blob that failed to land.
    let image_ref = match image {
        Some(raw) => {
            let (bytes, mime) =
                blobs::store::decode_image_payload(&raw).map_err(|_| StatusCode::BAD_REQUEST)?;
            let db = state.db.clone();
            let data_dir = state.data_dir.clone();
            let stored = tokio::task::spawn_blocking(move || {
                blobs::store::put_image(&db, &data_dir, &bytes, &mime)
            })
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to store message image");
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
            Some(stored)
        }
        None => None,
    };

    let db = state.db.clone();
    let created_at = Utc::now().timestamp_millis();
    let new_message = NewMessage {
        sender_id,
        receiver_id,
        text,
        image_ref,
        created_at,
    };

    let message = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        if !store::user_exists(&conn, &new_message.receiver_id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        {
            return Err(StatusCode::NOT_FOUND);
        }
        store::append(&conn, new_message).map_err(|e| {
            tracing::error!(error = %e, "Failed to append message");
            StatusCode::INTERNAL_SERVER_ERROR
        })
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    // Best-effort live push to recipient and sender. A miss (nobody
    // connected, or the connection died mid-send) is absorbed silently:
    // the message is already durable and the fetch path is authoritative.
    let event = ServerEvent::Message {
        sender: message.sender_id.clone(),
        content: message
            .text
            .clone()
            .or_else(|| message.image_ref.clone())
            .unwrap_or_default(),
        image: message.image_ref.clone(),
        timestamp: message.created_at,
    };
    push::send_to_user(&state.registry, &message.receiver_id, &event);
    push::send_to_user(&state.registry, &message.sender_id, &event);

    Ok(message)
}
