//! REST endpoints for account management: register, login, logout, profile.
//!
//! Thin glue around the relay core. Passwords are hashed with argon2; the
//! session is a stateless JWT, so logout is a client-side acknowledgement.

use axum::{extract::State, http::StatusCode, Json};
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::jwt;
use crate::auth::middleware::Claims;
use crate::blobs;
use crate::state::AppState;

/// Minimum password length accepted at registration.
const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum display name length (chars).
const MAX_DISPLAY_NAME_LENGTH: usize = 64;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    /// Base64 or data-URI image payload for a new avatar
    #[serde(default)]
    pub avatar: Option<String>,
}

/// POST /auth/register — Create an account and return a session token.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), StatusCode> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(StatusCode::BAD_REQUEST);
    }
    let display_name = body.display_name.trim().to_string();
    if display_name.is_empty() || display_name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(StatusCode::BAD_REQUEST);
    }
    if body.password.len() < MIN_PASSWORD_LENGTH {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();
    let password = body.password;

    let user = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let taken: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE email = ?1",
                rusqlite::params![email],
                |row| row.get(0),
            )
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        if taken > 0 {
            return Err(StatusCode::CONFLICT);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .to_string();

        let id = uuid::Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO users (id, email, password_hash, display_name, avatar_ref, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?5)",
            rusqlite::params![id, email, password_hash, display_name, now],
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        Ok(UserProfile {
            id,
            email,
            display_name,
            avatar_ref: None,
        })
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    let token = jwt::issue_access_token(&state.jwt_secret, &user.id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// POST /auth/login — Verify credentials and return a session token.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, StatusCode> {
    let email = body.email.trim().to_lowercase();
    let db = state.db.clone();
    let password = body.password;

    let user = tokio::task::spawn_blocking(move || -> Result<UserProfile, StatusCode> {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let row: Option<(String, String, String, Option<String>)> = conn
            .query_row(
                "SELECT id, password_hash, display_name, avatar_ref FROM users WHERE email = ?1",
                rusqlite::params![email],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .ok();

        let (id, password_hash, display_name, avatar_ref) =
            row.ok_or(StatusCode::UNAUTHORIZED)?;

        let parsed = PasswordHash::new(&password_hash)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| StatusCode::UNAUTHORIZED)?;

        Ok(UserProfile {
            id,
            email,
            display_name,
            avatar_ref,
        })
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    let token = jwt::issue_access_token(&state.jwt_secret, &user.id)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(AuthResponse { token, user }))
}

/// POST /auth/logout — Acknowledge logout. Tokens are stateless, so the
/// client simply discards its copy; nothing to revoke server-side.
pub async fn logout(_claims: Claims) -> StatusCode {
    StatusCode::OK
}

/// GET /auth/me — Current user's profile from the session token.
pub async fn me(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<UserProfile>, StatusCode> {
    let db = state.db.clone();
    let user_id = claims.sub;

    let profile = tokio::task::spawn_blocking(move || fetch_profile(&db, &user_id))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(profile))
}

/// PUT /auth/profile — Update display name and/or avatar image.
pub async fn update_profile(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, StatusCode> {
    let display_name = body
        .display_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if let Some(name) = &display_name {
        if name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
            return Err(StatusCode::BAD_REQUEST);
        }
    }
    let avatar = body.avatar.filter(|a| !a.is_empty());
    if display_name.is_none() && avatar.is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Resolve the avatar payload to a stored reference first
    let avatar_ref = match avatar {
        Some(raw) => {
            let (bytes, mime) = blobs::store::decode_image_payload(&raw)
                .map_err(|_| StatusCode::BAD_REQUEST)?;
            let db = state.db.clone();
            let data_dir = state.data_dir.clone();
            let stored = tokio::task::spawn_blocking(move || {
                blobs::store::put_image(&db, &data_dir, &bytes, &mime)
            })
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to store avatar image");
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
            Some(stored)
        }
        None => None,
    };

    let db = state.db.clone();
    let user_id = claims.sub;

    let profile = tokio::task::spawn_blocking(move || {
        {
            let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            let now = Utc::now().to_rfc3339();
            if let Some(name) = &display_name {
                conn.execute(
                    "UPDATE users SET display_name = ?1, updated_at = ?2 WHERE id = ?3",
                    rusqlite::params![name, now, user_id],
                )
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            }
            if let Some(avatar_ref) = &avatar_ref {
                conn.execute(
                    "UPDATE users SET avatar_ref = ?1, updated_at = ?2 WHERE id = ?3",
                    rusqlite::params![avatar_ref, now, user_id],
                )
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            }
        }
        fetch_profile(&db, &user_id)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(profile))
}

/// Load a user's public profile by id.
fn fetch_profile(db: &crate::db::DbPool, user_id: &str) -> Result<UserProfile, StatusCode> {
    let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    conn.query_row(
        "SELECT id, email, display_name, avatar_ref FROM users WHERE id = ?1",
        rusqlite::params![user_id],
        |row| {
            Ok(UserProfile {
                id: row.get(0)?,
                email: row.get(1)?,
                display_name: row.get(2)?,
                avatar_ref: row.get(3)?,
            })
        },
    )
    .map_err(|_| StatusCode::NOT_FOUND)
}
