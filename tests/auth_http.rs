use axum::extract::FromRef;
use axum_test::TestServer;
use cookie::Cookie;
use serde_json::{json, Value};
use uuid::Uuid;

use authflow::app::build_app;
use authflow::auth::token::JwtKeys;
use authflow::state::AppState;

// These tests exercise every path that fails (or succeeds) before touching
// the store: the fake state carries a lazily-connecting pool that is never
// dialed unless a handler reaches a query.
fn server() -> TestServer {
    TestServer::new(build_app(AppState::fake())).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let response = server().get("/health").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let response = server().post("/api/auth/logout").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Logged out successfully");

    let cleared = response.cookie("token");
    assert_eq!(cleared.value(), "");
}

#[tokio::test]
async fn check_auth_without_cookie_is_unauthorized() {
    let response = server().get("/api/auth/check-auth").await;

    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Unauthorized - no token provided");
}

#[tokio::test]
async fn check_auth_with_forged_cookie_is_unauthorized() {
    let response = server()
        .get("/api/auth/check-auth")
        .add_cookie(Cookie::new("token", "forged.token.value"))
        .await;

    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Unauthorized - invalid token");
}

#[tokio::test]
async fn check_auth_with_tampered_cookie_is_unauthorized() {
    let state = AppState::fake();
    let keys = JwtKeys::from_ref(&state);
    let mut token = keys.sign_session(Uuid::new_v4()).unwrap();
    token.push('x');

    let response = TestServer::new(build_app(state))
        .unwrap()
        .get("/api/auth/check-auth")
        .add_cookie(Cookie::new("token", token))
        .await;

    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn check_auth_with_valid_cookie_passes_the_session_check() {
    let state = AppState::fake();
    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_session(Uuid::new_v4()).unwrap();

    let response = TestServer::new(build_app(state))
        .unwrap()
        .get("/api/auth/check-auth")
        .add_cookie(Cookie::new("token", token))
        .await;

    // The fake pool has no live database behind it, so the lookup itself
    // fails; what matters is that a valid session is not rejected as 401.
    assert_ne!(response.status_code(), 401);
}

#[tokio::test]
async fn signup_rejects_missing_fields() {
    let response = server()
        .post("/api/auth/signup")
        .json(&json!({"email": "a@x.com", "password": "pw123456", "name": "  "}))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "All fields are required");
}

#[tokio::test]
async fn signup_rejects_malformed_email() {
    let response = server()
        .post("/api/auth/signup")
        .json(&json!({"email": "not-an-email", "password": "pw123456", "name": "Ann"}))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["message"], "Invalid email");
}

#[tokio::test]
async fn signup_rejects_short_password() {
    let response = server()
        .post("/api/auth/signup")
        .json(&json!({"email": "a@x.com", "password": "short", "name": "Ann"}))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Password too short");
}

#[tokio::test]
async fn login_rejects_malformed_email() {
    let response = server()
        .post("/api/auth/login")
        .json(&json!({"email": "nope", "password": "whatever1"}))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid email");
}

#[tokio::test]
async fn reset_password_rejects_empty_password() {
    let response = server()
        .post("/api/auth/reset-password/abcdef0123456789abcdef0123456789abcdef01")
        .json(&json!({"password": ""}))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "All fields are required");
}

#[tokio::test]
async fn reset_password_rejects_short_password() {
    let response = server()
        .post("/api/auth/reset-password/abcdef0123456789abcdef0123456789abcdef01")
        .json(&json!({"password": "short"}))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["message"], "Password too short");
}
