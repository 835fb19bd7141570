use rusqlite_migration::{Migrations, M};

/// Define all schema migrations.
/// Uses SQLite user_version pragma for tracking — no migration table needed.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(
            "-- Migration 1: users and messages

CREATE TABLE users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    display_name TEXT NOT NULL,
    avatar_ref TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Message rowid doubles as creation order within any conversation.
CREATE TABLE messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sender_id TEXT NOT NULL,
    receiver_id TEXT NOT NULL,
    text TEXT,
    image_ref TEXT,
    read INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    FOREIGN KEY (sender_id) REFERENCES users(id),
    FOREIGN KEY (receiver_id) REFERENCES users(id)
);

CREATE INDEX idx_messages_pair ON messages(sender_id, receiver_id, id);
CREATE INDEX idx_messages_pair_rev ON messages(receiver_id, sender_id, id);
",
        ),
        M::up(
            "-- Migration 2: image blob metadata
-- Image bytes live on disk under {data_dir}/images/{hash}; this table
-- tracks existence and the declared content type.

CREATE TABLE images (
    hash TEXT PRIMARY KEY,
    mime TEXT NOT NULL,
    size INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
",
        ),
    ])
}
