//! Roster endpoint: every other registered user, with live presence from
//! the connection registry.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::auth::middleware::Claims;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RosterEntry {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    /// Whether the user currently has a live connection bound in the registry
    pub online: bool,
}

/// GET /users — All users except the caller, ordered by display name.
pub async fn list_users(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<RosterEntry>>, StatusCode> {
    let db = state.db.clone();
    let registry = state.registry.clone();
    let user_id = claims.sub;

    let roster = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let mut stmt = conn
            .prepare(
                "SELECT id, email, display_name, avatar_ref FROM users
                 WHERE id != ?1
                 ORDER BY display_name ASC",
            )
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let entries: Vec<RosterEntry> = stmt
            .query_map(rusqlite::params![user_id], |row| {
                let id: String = row.get(0)?;
                let online = registry.online(&id);
                Ok(RosterEntry {
                    id,
                    email: row.get(1)?,
                    display_name: row.get(2)?,
                    avatar_ref: row.get(3)?,
                    online,
                })
            })
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .filter_map(|r| r.ok())
            .collect();

        Ok::<_, StatusCode>(entries)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(roster))
}
