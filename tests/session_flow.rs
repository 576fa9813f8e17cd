//! End-to-end session flow over the public API with an in-process fake
//! server and a file-backed credential store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rentify::api::types::ItemQuery;
use rentify::api::{auth, items};
use rentify::dashboard::load_rental_dashboard;
use rentify::{
    ApiError, ApiRequest, ApiResponse, CredentialStore, FileStore, HttpTransport, Route, SessionManager, SessionState,
};
use serde_json::{Value, json};

/// Issues `A<n>` access tokens; only the latest one is accepted.
#[derive(Default)]
struct FakeServer {
    generation: Mutex<u32>,
    revoked: Mutex<bool>,
    log: Mutex<Vec<String>>,
}

impl FakeServer {
    fn expire_access(&self) {
        *self.generation.lock().unwrap() += 1;
    }

    fn revoke_refresh(&self) {
        *self.revoked.lock().unwrap() = true;
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn current(&self) -> String {
        format!("A{}", *self.generation.lock().unwrap())
    }
}

#[async_trait]
impl HttpTransport for FakeServer {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.log.lock().unwrap().push(format!("{} {}", request.method.as_str(), request.path));
        let reply = match request.path.as_str() {
            "/auth/login/" => {
                *self.generation.lock().unwrap() = 1;
                ApiResponse::new(200, json!({ "access": "A1", "refresh": "R1", "email": "a@b.com", "user_name": "alice" }))
            }
            "/auth/refresh/" if *self.revoked.lock().unwrap() => {
                ApiResponse::new(401, json!({ "detail": "Token is blacklisted" }))
            }
            "/auth/refresh/" => ApiResponse::new(200, json!({ "access": self.current() })),
            _ if request.bearer.as_deref() != Some(self.current().as_str()) => {
                ApiResponse::new(401, json!({ "detail": "Given token not valid for any token type" }))
            }
            "/api/my-items/" => ApiResponse::new(200, json!([{ "id": 1, "title": "Drill" }, { "id": 2, "title": "Tent" }])),
            "/api/bookings/" => ApiResponse::new(
                200,
                json!([
                    { "item": 1, "status": "pending" },
                    { "item": 1, "status": "cancelled" },
                    { "item": 2, "status": "confirmed" },
                ]),
            ),
            "/api/items/" => ApiResponse::new(200, json!([])),
            "/api/auth/logout/" => ApiResponse::new(205, Value::Null),
            _ => ApiResponse::new(404, json!({ "detail": "Not found." })),
        };
        Ok(reply)
    }
}

#[tokio::test]
async fn login_refresh_and_logout_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let server = Arc::new(FakeServer::default());
    let store = Arc::new(FileStore::open(&path).unwrap());
    let session = SessionManager::new(server.clone(), store.clone());

    auth::login(&session, "a@b.com", "pw").await.unwrap();
    assert!(path.exists());

    // A fresh process picks the session back up from disk.
    let resumed = SessionManager::new(server.clone(), Arc::new(FileStore::open(&path).unwrap()));
    assert_eq!(resumed.state(), SessionState::Authenticated);
    assert_eq!(resumed.identity().user_name.as_deref(), Some("alice"));

    server.expire_access();
    let dashboard = load_rental_dashboard(&session).await.unwrap();
    assert_eq!(dashboard.requests_for(1).len(), 1);
    assert_eq!(dashboard.requests_for(2).len(), 1);
    assert_eq!(session.access_token().as_deref(), Some("A2"));
    assert_eq!(server.log().iter().filter(|l| l.ends_with("/auth/refresh/")).count(), 1);

    session.logout().await.unwrap();
    assert!(!path.exists());
    assert_eq!(session.take_redirect(), Some(Route::Home));
}

#[tokio::test]
async fn revoked_refresh_forces_login() {
    let dir = tempfile::tempdir().unwrap();
    let server = Arc::new(FakeServer::default());
    let store = Arc::new(FileStore::open(dir.path().join("session.json")).unwrap());
    let session = SessionManager::new(server.clone(), store.clone());

    auth::login(&session, "a@b.com", "pw").await.unwrap();
    server.expire_access();
    server.revoke_refresh();

    let err = items::list_items(&session, &ItemQuery::default()).await.unwrap_err();
    assert!(matches!(err, ApiError::SessionExpired));
    assert!(err.requires_login());
    assert!(store.is_empty());
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(session.take_redirect(), Some(Route::Login));
}
