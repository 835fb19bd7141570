//! Live connection registry.
//!
//! Maps each user id to the single connection currently allowed to receive
//! live pushes for that user. Owned by the composition root and carried in
//! `AppState`; handlers receive it by reference, never through a global.

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;

/// Handle to one live WebSocket connection: the sender half of the channel
/// feeding that connection's writer task. Cloning is cheap; sending to a
/// closed handle returns an error that callers ignore.
pub type ConnectionHandle = mpsc::UnboundedSender<Message>;

/// user id -> connection handle, at most one binding per user.
///
/// Every operation is a single DashMap call, so there is no read-then-write
/// gap between concurrent announces, lookups, and removes. Must never be
/// held across an await point.
#[derive(Default)]
pub struct ConnectionRegistry {
    bindings: DashMap<String, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            bindings: DashMap::new(),
        }
    }

    /// Bind `identity` to `handle`, unconditionally replacing any prior
    /// binding (last announce wins; the displaced connection stays open but
    /// stops receiving pushes). Idempotent for repeated announces from the
    /// same connection.
    pub fn announce(&self, identity: &str, handle: ConnectionHandle) {
        self.bindings.insert(identity.to_string(), handle);
    }

    /// Current binding for `identity`, if any.
    pub fn lookup(&self, identity: &str) -> Option<ConnectionHandle> {
        self.bindings.get(identity).map(|entry| entry.value().clone())
    }

    /// Remove the binding for `identity` only if `handle` is still the
    /// connection on file (same underlying channel). A close event from a
    /// connection that has already been displaced is a no-op, so a stale
    /// close can never evict a fresher connection for the same user.
    pub fn remove(&self, identity: &str, handle: &ConnectionHandle) {
        self.bindings
            .remove_if(identity, |_, bound| bound.same_channel(handle));
    }

    /// Whether any connection is currently bound for `identity`.
    pub fn online(&self, identity: &str) -> bool {
        self.bindings.contains_key(identity)
    }

    /// Snapshot of the identities that currently have a live connection.
    pub fn online_identities(&self) -> Vec<String> {
        self.bindings.iter().map(|entry| entry.key().clone()).collect()
    }
}
