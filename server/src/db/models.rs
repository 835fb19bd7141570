/// Database row types for all tables.
/// These correspond 1:1 to the SQLite schema defined in migrations.rs.
use serde::Serialize;

/// User record in the users table
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Persisted chat message between two users.
///
/// Immutable once created except for `read`, which only ever transitions
/// false -> true. Serialized as-is in HTTP responses: the persisted row is
/// the authoritative confirmation of a send.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: i64,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: Option<String>,
    pub image_ref: Option<String>,
    pub read: bool,
    /// Unix millis at creation; ordering authority is `id`.
    pub created_at: i64,
}

/// Image blob metadata (bytes stored on disk, metadata in DB)
#[derive(Debug, Clone)]
pub struct ImageRow {
    pub hash: String,
    pub mime: String,
    pub size: i64,
    pub created_at: String,
}
