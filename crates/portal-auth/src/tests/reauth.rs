//! Rejected sessions and stored-session restore.

use super::harness::{access_token, login_ok, session_with_store, session_for, MockBackend, MockResponse};
use crate::{
    resolve, ApiRequest, AuthError, Credentials, RouteOutcome, SessionSnapshot, SessionState, View,
};
use parking_lot::Mutex;
use portal_storage::{create_token_store, ClientStorage, MemoryStorage, StorageKeys, TokenPair, TokenStore};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn unauthorized_call_clears_session_and_redirects_to_login() {
    let backend = MockBackend::start().await;
    backend.on("POST", "/auth/login/", login_ok(1, "admin", 1));
    backend.on(
        "GET",
        "/patients/",
        MockResponse::json(401, json!({"detail": "Given token not valid for any token type"})),
    );
    let (session, tokens) = session_for(&backend);
    session
        .login(&Credentials::new("admin1", "pw", "1"))
        .await
        .unwrap();

    let visited = Arc::new(Mutex::new(Vec::new()));
    let sink = visited.clone();
    session.set_navigation_callback(Box::new(move |view| sink.lock().push(view)));

    let err = session
        .authorized_call("/patients/", ApiRequest::get())
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(session.snapshot(), SessionSnapshot::anonymous());
    assert_eq!(tokens.load(), None);
    assert_eq!(*visited.lock(), vec![View::Login]);
    assert_eq!(
        resolve("/hospital-dashboard", &session.snapshot()),
        RouteOutcome::Redirect(View::Login)
    );
}

#[tokio::test]
async fn other_errors_leave_session_alone() {
    let backend = MockBackend::start().await;
    backend.on("POST", "/auth/login/", login_ok(1, "admin", 1));
    backend.on(
        "GET",
        "/patients/",
        MockResponse::json(403, json!({"detail": "You do not have permission"})),
    );
    let (session, tokens) = session_for(&backend);
    session
        .login(&Credentials::new("admin1", "pw", "1"))
        .await
        .unwrap();

    let err = session
        .authorized_call("/patients/", ApiRequest::get())
        .await
        .unwrap_err();

    assert!(matches!(&err, AuthError::Api(e) if e.status() == Some(403)));
    assert_eq!(err.user_message(), "You do not have permission");
    assert!(session.snapshot().state.is_authenticated());
    assert!(tokens.load().is_some());
}

#[tokio::test]
async fn legacy_token_is_sent_and_cleared_on_rejection() {
    let backend = MockBackend::start().await;
    backend.on("GET", "/beds/", MockResponse::json(401, json!({"detail": "expired"})));

    let storage = MemoryStorage::new();
    storage
        .set(StorageKeys::LEGACY_ACCESS_TOKEN, "legacy-token")
        .unwrap();
    let tokens = Arc::new(TokenStore::new(Box::new(storage)));
    let (session, tokens) = session_with_store(&backend, tokens);
    session.initialize();
    assert_eq!(session.snapshot().state, SessionState::Anonymous);

    session
        .authorized_call("/beds/", ApiRequest::get())
        .await
        .unwrap_err();

    assert_eq!(
        backend.requests()[0].header("authorization"),
        Some("Bearer legacy-token")
    );
    assert_eq!(tokens.bearer_token(), None);
}

#[tokio::test]
async fn session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    let backend = MockBackend::start().await;
    backend.on("POST", "/auth/login/", login_ok(9, "admin", 4));

    let first_tokens = Arc::new(create_token_store(&path).unwrap());
    let (first, _) = session_with_store(&backend, first_tokens);
    let identity = first
        .login(&Credentials::new("admin9", "pw", "4"))
        .await
        .unwrap();

    let second_tokens = Arc::new(create_token_store(&path).unwrap());
    let (second, _) = session_with_store(&backend, second_tokens);
    assert_eq!(second.snapshot(), SessionSnapshot::initializing());

    let restored = second.initialize();
    assert_eq!(restored, SessionSnapshot::authenticated(identity));
    assert_eq!(
        resolve("/hospital-dashboard", &restored),
        RouteOutcome::Render(View::HospitalDashboard)
    );
}

#[tokio::test]
async fn corrupt_identity_cache_falls_back_to_claims() {
    let backend = MockBackend::start().await;
    let storage = MemoryStorage::new();
    storage.set(StorageKeys::USER_INFO, "{broken").unwrap();
    let tokens = Arc::new(TokenStore::new(Box::new(storage)));
    tokens
        .save(&TokenPair::new(access_token(12, "receptionist"), "r"))
        .unwrap();

    let (session, _) = session_with_store(&backend, tokens);
    let snapshot = session.initialize();

    let identity = snapshot.identity().unwrap();
    assert_eq!(identity.user_id, 12);
    assert_eq!(identity.role, Some(crate::Role::Receptionist));
}

#[tokio::test]
async fn corrupt_token_pair_settles_anonymous() {
    let backend = MockBackend::start().await;
    let storage = MemoryStorage::new();
    storage.set(StorageKeys::AUTH_TOKENS, "not json at all").unwrap();
    let tokens = Arc::new(TokenStore::new(Box::new(storage)));

    let (session, tokens) = session_with_store(&backend, tokens);
    let waiter = tokio::spawn({
        let session = session.clone();
        async move { session.wait_until_settled().await }
    });
    session.initialize();

    assert_eq!(waiter.await.unwrap().state, SessionState::Anonymous);
    assert_eq!(tokens.load(), None);
}
