//! Message store: the durable, ordered record of messages between user pairs.
//!
//! Synchronous rusqlite functions over an already-locked connection; callers
//! hold the DbPool lock inside tokio::task::spawn_blocking. Creation order is
//! the rowid, so a conversation is ordered by `id` regardless of clock skew.

use rusqlite::{params, Connection};

use crate::db::models::Message;

/// Fields of a message about to be persisted. `id` and `read` are assigned
/// by `append`.
#[derive(Debug)]
pub struct NewMessage {
    pub sender_id: String,
    pub receiver_id: String,
    pub text: Option<String>,
    pub image_ref: Option<String>,
    pub created_at: i64,
}

/// Persist a message. Single INSERT: succeeds or fails atomically, and the
/// assigned rowid fixes the message's position in its conversation.
pub fn append(conn: &Connection, msg: NewMessage) -> rusqlite::Result<Message> {
    conn.execute(
        "INSERT INTO messages (sender_id, receiver_id, text, image_ref, read, created_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        params![
            msg.sender_id,
            msg.receiver_id,
            msg.text,
            msg.image_ref,
            msg.created_at
        ],
    )?;
    let id = conn.last_insert_rowid();
    Ok(Message {
        id,
        sender_id: msg.sender_id,
        receiver_id: msg.receiver_id,
        text: msg.text,
        image_ref: msg.image_ref,
        read: false,
        created_at: msg.created_at,
    })
}

/// Point-in-time snapshot of the conversation between two users, both
/// directions, ascending creation order.
pub fn list_conversation(
    conn: &Connection,
    user_a: &str,
    user_b: &str,
) -> rusqlite::Result<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT id, sender_id, receiver_id, text, image_ref, read, created_at
         FROM messages
         WHERE (sender_id = ?1 AND receiver_id = ?2)
            OR (sender_id = ?2 AND receiver_id = ?1)
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![user_a, user_b], |row| {
        Ok(Message {
            id: row.get(0)?,
            sender_id: row.get(1)?,
            receiver_id: row.get(2)?,
            text: row.get(3)?,
            image_ref: row.get(4)?,
            read: row.get::<_, i64>(5)? != 0,
            created_at: row.get(6)?,
        })
    })?;
    rows.collect()
}

/// Flip every unread message from `sender_id` to `receiver_id` to read.
/// One UPDATE statement, so the batch applies as a whole. Returns the number
/// of messages transitioned.
pub fn mark_read(
    conn: &Connection,
    sender_id: &str,
    receiver_id: &str,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE messages SET read = 1
         WHERE sender_id = ?1 AND receiver_id = ?2 AND read = 0",
        params![sender_id, receiver_id],
    )
}

/// Whether a user row exists for `user_id`.
pub fn user_exists(conn: &Connection, user_id: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
