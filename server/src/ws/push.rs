//! Best-effort live push: try-send, ignore-if-unreachable.
//!
//! At-most-once, no retry, no queue. Distinct from the message store's
//! durable guarantee — a failed push here means the recipient catches up on
//! the next conversation fetch.

use axum::extract::ws::Message;

use crate::registry::{ConnectionHandle, ConnectionRegistry};
use crate::ws::protocol::ServerEvent;

/// Serialize an event and try-send it on a specific connection handle.
/// A send error means the connection is gone; the event is dropped.
pub fn send_event(handle: &ConnectionHandle, event: &ServerEvent) {
    if let Ok(json) = serde_json::to_string(event) {
        let _ = handle.send(Message::Text(json.into()));
    }
}

/// Push an event to whatever connection is currently bound for `identity`.
/// No binding means nobody is listening; the event is dropped.
pub fn send_to_user(registry: &ConnectionRegistry, identity: &str, event: &ServerEvent) {
    if let Some(handle) = registry.lookup(identity) {
        send_event(&handle, event);
    }
}
