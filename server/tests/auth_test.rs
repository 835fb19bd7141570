//! Integration tests for account registration, login, and profile updates.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Start the server on a random port and return its base URL.
async fn start_test_server() -> String {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = parley_server::db::init_db(&data_dir).expect("Failed to init DB");
    let jwt_secret = parley_server::auth::jwt::load_or_generate_jwt_secret(&data_dir)
        .expect("Failed to generate JWT secret");
    let registry = Arc::new(parley_server::registry::ConnectionRegistry::new());

    let state = parley_server::state::AppState {
        db,
        registry,
        jwt_secret,
        data_dir,
    };

    let app = parley_server::routes::build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
        let _keep = tmp_dir;
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_register_login_me_flow() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({
            "email": "alice@example.com",
            "password": "correct horse battery",
            "display_name": "Alice",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    let user_id = body["user"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert!(body["token"].as_str().is_some());

    // Fresh login returns a working token
    let resp = client
        .post(format!("{}/auth/login", base_url))
        .json(&serde_json::json!({
            "email": "alice@example.com",
            "password": "correct horse battery",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let login: serde_json::Value = resp.json().await.unwrap();
    let token = login["token"].as_str().unwrap();

    let resp = client
        .get(format!("{}/auth/me", base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let me: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(me["id"].as_str(), Some(user_id.as_str()));
    assert_eq!(me["display_name"], "Alice");
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let payload = serde_json::json!({
        "email": "bob@example.com",
        "password": "hunter2hunter2",
        "display_name": "Bob",
    });

    let resp = client
        .post(format!("{}/auth/register", base_url))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = client
        .post(format!("{}/auth/register", base_url))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn test_login_wrong_password_unauthorized() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({
            "email": "carol@example.com",
            "password": "correct horse battery",
            "display_name": "Carol",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = client
        .post(format!("{}/auth/login", base_url))
        .json(&serde_json::json!({
            "email": "carol@example.com",
            "password": "wrong password!!",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_me_requires_token() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/auth/me", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_profile_update_changes_roster_entry() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({
            "email": "dave@example.com",
            "password": "correct horse battery",
            "display_name": "Dave",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let dave: serde_json::Value = resp.json().await.unwrap();
    let dave_token = dave["token"].as_str().unwrap().to_string();

    let resp = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({
            "email": "erin@example.com",
            "password": "correct horse battery",
            "display_name": "Erin",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let erin: serde_json::Value = resp.json().await.unwrap();
    let erin_token = erin["token"].as_str().unwrap().to_string();

    // Dave renames himself
    let resp = client
        .put(format!("{}/auth/profile", base_url))
        .bearer_auth(&dave_token)
        .json(&serde_json::json!({ "display_name": "David" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let profile: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(profile["display_name"], "David");

    // Erin's roster reflects the new name, and Dave is offline (no WS)
    let resp = client
        .get(format!("{}/users", base_url))
        .bearer_auth(&erin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let roster: serde_json::Value = resp.json().await.unwrap();
    let entries = roster.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["display_name"], "David");
    assert_eq!(entries[0]["online"], false);
}

#[tokio::test]
async fn test_empty_profile_update_is_bad_request() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/auth/register", base_url))
        .json(&serde_json::json!({
            "email": "frank@example.com",
            "password": "correct horse battery",
            "display_name": "Frank",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let frank: serde_json::Value = resp.json().await.unwrap();
    let token = frank["token"].as_str().unwrap().to_string();

    let resp = client
        .put(format!("{}/auth/profile", base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
