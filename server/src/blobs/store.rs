//! Content-addressed image storage.
//!
//! Each image is stored as:
//! - Metadata row in the `images` table (hash, mime, size)
//! - Raw file at `{data_dir}/images/{hex_hash}`
//!
//! The stable reference handed back to callers (and persisted on messages)
//! is the serving path `/images/{hex_hash}`.

use base64::{engine::general_purpose::STANDARD, Engine};
use rusqlite::OptionalExtension;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::db::DbPool;

/// Compute the image storage directory path.
fn images_dir(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join("images")
}

/// Compute the file path for an image given its hex hash.
fn image_file_path(data_dir: &str, hash_hex: &str) -> PathBuf {
    images_dir(data_dir).join(hash_hex)
}

/// Decode a client-supplied image payload: either a data URI
/// ("data:image/png;base64,....") or bare base64 bytes.
/// Returns the raw bytes and the declared content type.
pub fn decode_image_payload(input: &str) -> Result<(Vec<u8>, String), base64::DecodeError> {
    if let Some(rest) = input.strip_prefix("data:") {
        if let Some((mime, payload)) = rest.split_once(";base64,") {
            let bytes = STANDARD.decode(payload)?;
            return Ok((bytes, mime.to_string()));
        }
    }
    let bytes = STANDARD.decode(input)?;
    Ok((bytes, "application/octet-stream".to_string()))
}

/// Store an image: write file, insert metadata. Content-addressed, so
/// storing the same bytes twice is a no-op that returns the same reference.
pub fn put_image(
    db: &DbPool,
    data_dir: &str,
    data: &[u8],
    mime: &str,
) -> Result<String, String> {
    let hash_hex = hex::encode(Sha256::digest(data));

    if !has_image(db, &hash_hex) {
        let dir = images_dir(data_dir);
        std::fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create images directory: {}", e))?;

        std::fs::write(image_file_path(data_dir, &hash_hex), data)
            .map_err(|e| format!("Failed to write image file: {}", e))?;

        let conn = db.lock().map_err(|e| format!("DB lock error: {}", e))?;
        conn.execute(
            "INSERT OR IGNORE INTO images (hash, mime, size) VALUES (?1, ?2, ?3)",
            rusqlite::params![hash_hex, mime, data.len() as i64],
        )
        .map_err(|e| format!("Failed to insert image metadata: {}", e))?;

        tracing::debug!("Stored image {} ({} bytes)", hash_hex, data.len());
    }

    Ok(format!("/images/{}", hash_hex))
}

/// Retrieve an image by its hex hash.
///
/// Returns `Ok(Some((bytes, mime)))` if found, `Ok(None)` if not found.
pub fn get_image(
    db: &DbPool,
    data_dir: &str,
    hash_hex: &str,
) -> Result<Option<(Vec<u8>, String)>, String> {
    let mime: Option<String> = {
        let conn = db.lock().map_err(|e| format!("DB lock error: {}", e))?;
        conn.query_row(
            "SELECT mime FROM images WHERE hash = ?1",
            rusqlite::params![hash_hex],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| format!("Failed to query image metadata: {}", e))?
    };

    let Some(mime) = mime else {
        return Ok(None);
    };

    let file_path = image_file_path(data_dir, hash_hex);
    let bytes = std::fs::read(&file_path)
        .map_err(|e| format!("Failed to read image file {}: {}", file_path.display(), e))?;

    Ok(Some((bytes, mime)))
}

/// Check whether an image exists in the metadata table.
pub fn has_image(db: &DbPool, hash_hex: &str) -> bool {
    let conn = match db.lock() {
        Ok(c) => c,
        Err(_) => return false,
    };
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM images WHERE hash = ?1",
            rusqlite::params![hash_hex],
            |row| row.get(0),
        )
        .unwrap_or(0);
    count > 0
}
