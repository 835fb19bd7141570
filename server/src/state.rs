use std::sync::Arc;

use crate::db::DbPool;
use crate::registry::ConnectionRegistry;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// Live connection registry: user id -> connection handle
    pub registry: Arc<ConnectionRegistry>,
    /// JWT signing secret (256-bit random key)
    pub jwt_secret: Vec<u8>,
    /// Data directory for the database and stored images
    pub data_dir: String,
}
