use axum::{middleware, Router};
use std::sync::Arc;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::auth::accounts;
use crate::auth::middleware::JwtSecret;
use crate::blobs::routes as blob_routes;
use crate::chat::{messages, roster};
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// Inject the JWT secret into request extensions so the Claims extractor can find it.
async fn inject_jwt_secret(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    req.extensions_mut()
        .insert(JwtSecret(state.jwt_secret.clone()));
    next.run(req).await
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Rate limiting: 5 requests per minute per IP on credential endpoints.
    // Uses PeerIpKeyExtractor which reads from ConnectInfo<SocketAddr>
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(12) // 1 token every 12 seconds = 5 per minute
            .burst_size(5) // Allow burst of 5
            .finish()
            .expect("Failed to build governor config"),
    );
    let governor_limiter = governor_config.limiter().clone();

    // Spawn background task to clean up rate limiter state
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            governor_limiter.retain_recent();
        }
    });

    // Credential routes with rate limiting
    let auth_routes = Router::new()
        .route("/auth/register", axum::routing::post(accounts::register))
        .route("/auth/login", axum::routing::post(accounts::login))
        .layer(GovernorLayer {
            config: governor_config,
        });

    // Session routes (JWT required — Claims extractor validates token)
    let session_routes = Router::new()
        .route("/auth/logout", axum::routing::post(accounts::logout))
        .route("/auth/me", axum::routing::get(accounts::me))
        .route("/auth/profile", axum::routing::put(accounts::update_profile));

    // Chat routes (JWT required)
    let chat_routes = Router::new()
        .route("/users", axum::routing::get(roster::list_users))
        .route(
            "/conversation/{peer_id}",
            axum::routing::get(messages::get_conversation),
        )
        .route(
            "/messages/{peer_id}",
            axum::routing::post(messages::send_message),
        )
        .route(
            "/messages/{peer_id}/read",
            axum::routing::put(messages::mark_read),
        );

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/images/{image_id}", axum::routing::get(blob_routes::get_image))
        .route("/health", axum::routing::get(health_check));

    // WebSocket endpoint (auth via query param, not JWT header)
    let ws_routes = Router::new().route("/ws", axum::routing::get(ws_handler::ws_upgrade));

    Router::new()
        .merge(auth_routes)
        .merge(session_routes)
        .merge(chat_routes)
        .merge(public_routes)
        .merge(ws_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_jwt_secret,
        ))
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
