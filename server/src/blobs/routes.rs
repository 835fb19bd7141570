use axum::{
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
};

use crate::blobs::store;
use crate::state::AppState;

/// GET /images/{image_id}
/// Serve a stored image blob by its content hash. Public: the reference is
/// an unguessable hash and messages embed it directly.
pub async fn get_image(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Result<(StatusCode, [(HeaderName, String); 1], Vec<u8>), StatusCode> {
    // Hashes are lowercase hex; anything else is not a valid reference
    if image_id.is_empty() || !image_id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();
    let data_dir = state.data_dir.clone();

    let found = tokio::task::spawn_blocking(move || store::get_image(&db, &data_dir, &image_id))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to read image blob");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    match found {
        Some((bytes, mime)) => Ok((StatusCode::OK, [(header::CONTENT_TYPE, mime)], bytes)),
        None => Err(StatusCode::NOT_FOUND),
    }
}
