//! JSON frame protocol for the live channel.
//!
//! Inbound frames are parsed once at the boundary into a tagged enum; a
//! frame that fails to parse (bad JSON, unknown kind, missing fields) is
//! dropped with a log entry and never terminates the connection. The relay
//! never touches the message store: persistence happens on the HTTP write
//! path before any frame reaches a socket.

use serde::{Deserialize, Serialize};

use crate::registry::{ConnectionHandle, ConnectionRegistry};
use crate::ws::push;

/// Frames a client may send over the live channel.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Re-announce this connection. The registry binding is created from the
    /// authenticated session at accept time already, so this is an idempotent
    /// refresh; a `sender` that does not match the session is a spoof attempt
    /// and the frame is dropped.
    Connect { sender: String },
    /// Relay a chat message to the recipient's live connection. The message
    /// itself was already persisted by the HTTP write path.
    Chat {
        sender: String,
        recipient_id: String,
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        image: Option<String>,
        #[serde(default)]
        timestamp: Option<i64>,
    },
    /// Typing indicator for the recipient.
    Typing { sender: String, recipient_id: String },
    /// Read receipt: notify the original sender (`recipient_id` here is the
    /// peer to be notified) that `message_id` was marked read.
    Read {
        message_id: i64,
        recipient_id: String,
    },
}

/// Events pushed to clients over the live channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A chat message delivery. `content` carries the text, or the image
    /// reference when the message has no text.
    Message {
        sender: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        image: Option<String>,
        timestamp: i64,
    },
    Typing { sender: String },
    Read { message_id: i64 },
}

/// Parse and route one inbound frame from an announced connection.
///
/// Single synchronous step: registry operations and pushes never suspend,
/// so frames from one connection are handled strictly in arrival order.
pub fn handle_frame(
    raw: &str,
    origin: &ConnectionHandle,
    registry: &ConnectionRegistry,
    authenticated_id: &str,
) {
    let frame: ClientFrame = match serde_json::from_str(raw) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(
                user_id = %authenticated_id,
                error = %e,
                "Dropping malformed frame"
            );
            return;
        }
    };

    match frame {
        ClientFrame::Connect { sender } => {
            if sender != authenticated_id {
                tracing::warn!(
                    user_id = %authenticated_id,
                    claimed = %sender,
                    "Dropping connect frame with mismatched identity"
                );
                return;
            }
            registry.announce(authenticated_id, origin.clone());
        }
        ClientFrame::Chat {
            sender,
            recipient_id,
            content,
            image,
            timestamp,
        } => {
            if sender != authenticated_id {
                tracing::warn!(
                    user_id = %authenticated_id,
                    claimed = %sender,
                    "Dropping chat frame with mismatched identity"
                );
                return;
            }
            let Some(content) = content.or_else(|| image.clone()) else {
                tracing::warn!(
                    user_id = %authenticated_id,
                    "Dropping chat frame with neither content nor image"
                );
                return;
            };
            let event = ServerEvent::Message {
                sender: sender.clone(),
                content,
                image,
                timestamp: timestamp
                    .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
            };

            // Live delivery to the recipient, if connected; a miss is silent.
            push::send_to_user(registry, &recipient_id, &event);

            // Echo back to the originating connection, and to the sender's
            // registered connection when that is a different one, so every
            // open tab for the sender stays in sync.
            push::send_event(origin, &event);
            if let Some(own) = registry.lookup(&sender) {
                if !own.same_channel(origin) {
                    push::send_event(&own, &event);
                }
            }
        }
        ClientFrame::Typing { sender, recipient_id } => {
            if sender != authenticated_id {
                tracing::warn!(
                    user_id = %authenticated_id,
                    claimed = %sender,
                    "Dropping typing frame with mismatched identity"
                );
                return;
            }
            push::send_to_user(registry, &recipient_id, &ServerEvent::Typing { sender });
        }
        ClientFrame::Read {
            message_id,
            recipient_id,
        } => {
            push::send_to_user(registry, &recipient_id, &ServerEvent::Read { message_id });
        }
    }
}
