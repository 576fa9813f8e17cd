use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::net::Method;
use crate::net::mock::{MockTransport, ok, status};
use crate::session::SessionState;
use crate::session::store::{CredentialStore, MemoryStore};

fn setup(responses: Vec<Result<crate::net::ApiResponse, ApiError>>) -> (Arc<MockTransport>, Arc<MemoryStore>, SessionManager) {
    let transport = Arc::new(MockTransport::scripted(responses));
    let store = Arc::new(MemoryStore::new());
    let session = SessionManager::new(transport.clone(), store.clone());
    (transport, store, session)
}

// =============================================================
// Login
// =============================================================

#[tokio::test]
async fn login_establishes_session() {
    let (transport, store, session) =
        setup(vec![ok(json!({ "access": "A1", "refresh": "R1", "email": "a@b.com", "user_name": "alice" }))]);

    let login = login(&session, "a@b.com", "pw").await.unwrap();
    assert_eq!(login.access, "A1");
    assert_eq!(session.state(), SessionState::Authenticated);
    assert_eq!(store.get("token").as_deref(), Some("A1"));
    assert_eq!(store.get("refresh").as_deref(), Some("R1"));
    assert_eq!(store.get("user_name").as_deref(), Some("alice"));

    let sent = transport.requests();
    assert_eq!(sent[0].path, "/auth/login/");
    assert_eq!(sent[0].method, Method::Post);
    assert!(sent[0].public);
    assert_eq!(sent[0].body, Some(json!({ "email": "a@b.com", "password": "pw" })));
}

#[tokio::test]
async fn bad_credentials_leave_session_anonymous() {
    let (transport, store, session) =
        setup(vec![status(401, json!({ "detail": "No active account found with the given credentials" }))]);

    let err = login(&session, "a@b.com", "wrong").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert!(store.is_empty());
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn unverified_login_surfaces_forbidden_message() {
    let (_, _, session) = setup(vec![status(403, json!({ "detail": "Email not verified" }))]);
    let err = login(&session, "a@b.com", "pw").await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden { ref message } if message == "Email not verified"));
}

// =============================================================
// Registration and verification
// =============================================================

#[tokio::test]
async fn register_posts_payload() {
    let (transport, _, session) = setup(vec![ok(json!({ "message": "Check your inbox", "email": "a@b.com" }))]);
    let request =
        RegisterRequest { email: "a@b.com".into(), user_name: "alice".into(), password: "Secret123!".into() };

    let resp = register(&session, &request).await.unwrap();
    assert_eq!(resp.message.as_deref(), Some("Check your inbox"));
    let sent = transport.requests();
    assert_eq!(sent[0].path, "/auth/register/");
    assert_eq!(sent[0].body, Some(json!({ "email": "a@b.com", "user_name": "alice", "password": "Secret123!" })));
}

#[tokio::test]
async fn register_validation_errors_are_flattened() {
    let (_, _, session) = setup(vec![status(400, json!({ "email": ["user with this email already exists."] }))]);
    let request = RegisterRequest { email: "a@b.com".into(), user_name: "alice".into(), password: "pw".into() };

    match register(&session, &request).await.unwrap_err() {
        ApiError::Validation { messages } => {
            assert_eq!(messages, vec!["email: user with this email already exists.".to_owned()]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn check_verification_reads_flag() {
    let (transport, _, session) = setup(vec![ok(json!({ "email": "a@b.com", "is_verified": true }))]);
    let status = check_verification(&session, "a@b.com").await.unwrap();
    assert!(status.is_verified);
    assert_eq!(transport.requests()[0].path, "/auth/check-verification/");
}

#[tokio::test]
async fn verify_email_uses_link_segments() {
    let (transport, _, session) = setup(vec![ok(json!({ "detail": "Email verified" }))]);
    let resp = verify_email(&session, "MQ", "abc-123").await.unwrap();
    assert_eq!(resp.message.as_deref(), Some("Email verified"));
    let sent = transport.requests();
    assert_eq!(sent[0].method, Method::Get);
    assert_eq!(sent[0].path, "/auth/verify-email/MQ/abc-123/");
    assert!(sent[0].public);
}

#[tokio::test]
async fn send_verification_is_public() {
    let (transport, store, session) = setup(vec![ok(json!({ "message": "sent" }))]);
    store.set("token", "A1").unwrap();
    send_verification(&session, "a@b.com").await.unwrap();
    let sent = transport.requests();
    assert_eq!(sent[0].path, "/auth/send-verification/");
    assert!(sent[0].bearer.is_none());
}

// =============================================================
// Password reset
// =============================================================

#[tokio::test]
async fn forgot_and_reset_password() {
    let (transport, _, session) = setup(vec![ok(json!({ "message": "sent" })), ok(json!({ "message": "done" }))]);

    forgot_password(&session, "a@b.com").await.unwrap();
    reset_password(&session, "MQ", "tok", "N3wPass!").await.unwrap();

    let sent = transport.requests();
    assert_eq!(sent[0].path, "/auth/forgot-password/");
    assert_eq!(sent[0].body, Some(json!({ "email": "a@b.com" })));
    assert_eq!(sent[1].path, "/auth/reset-password/");
    assert_eq!(sent[1].body, Some(json!({ "uidb64": "MQ", "token": "tok", "new_password": "N3wPass!" })));
}

#[tokio::test]
async fn expired_reset_link_does_not_refresh() {
    let (transport, store, session) = setup(vec![status(401, json!({ "detail": "Invalid token" }))]);
    store.set_many(&[("token", "A1"), ("refresh", "R1")]).unwrap();

    let err = reset_password(&session, "MQ", "bad", "pw").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert_eq!(transport.count_path("/auth/refresh/"), 0);
}

// =============================================================
// Current user
// =============================================================

#[tokio::test]
async fn current_user_carries_bearer() {
    let (transport, store, session) = setup(vec![ok(json!({ "id": 7, "email": "a@b.com", "user_name": "alice" }))]);
    store.set_many(&[("token", "A1"), ("refresh", "R1")]).unwrap();

    let user = current_user(&session).await.unwrap();
    assert_eq!(user.id, 7);
    assert_eq!(transport.requests()[0].path, "/api/auth/me/");
    assert_eq!(transport.requests()[0].bearer.as_deref(), Some("A1"));
}

// =============================================================
// Profile update
// =============================================================

#[tokio::test]
async fn update_profile_patches_only_set_fields() {
    let (transport, store, session) = setup(vec![ok(json!({
        "id": 7, "email": "a@b.com", "user_name": "alice", "phone": "555-0100",
        "address": null, "rating": "4.50", "total_ratings": 2
    }))]);
    store.set_many(&[("token", "A1"), ("refresh", "R1")]).unwrap();

    let update = ProfileUpdate { phone: Some("555-0100".into()), ..ProfileUpdate::default() };
    let user = update_profile(&session, &update).await.unwrap();
    assert_eq!(user.phone.as_deref(), Some("555-0100"));
    assert_eq!(user.rating, Some(4.5));
    assert_eq!(user.total_ratings, 2);

    let sent = transport.requests();
    assert_eq!(sent[0].method, Method::Patch);
    assert_eq!(sent[0].path, "/api/auth/user/profile/");
    assert_eq!(sent[0].body, Some(json!({ "phone": "555-0100" })));
    assert_eq!(sent[0].bearer.as_deref(), Some("A1"));
}

#[tokio::test]
async fn empty_profile_update_is_rejected_locally() {
    let (transport, store, session) = setup(vec![]);
    store.set_many(&[("token", "A1"), ("refresh", "R1")]).unwrap();

    let err = update_profile(&session, &ProfileUpdate::default()).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation { .. }));
    assert!(transport.requests().is_empty());
}
