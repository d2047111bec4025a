//! Overlapping login attempts.
//!
//! The most recently started attempt decides the session. Older attempts that
//! resolve afterwards (or before) are discarded without touching state.

use super::harness::{access_token, login_ok, session_for, MockBackend, MockResponse};
use crate::{AuthError, Credentials, Role, SessionContext, SessionSnapshot, SessionState};
use portal_storage::{Identity, TokenPair};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

fn spawn_login(
    session: &Arc<SessionContext>,
    username: &str,
) -> JoinHandle<Result<Identity, AuthError>> {
    let session = session.clone();
    let credentials = Credentials::new(username, "pw", "1");
    tokio::spawn(async move { session.login(&credentials).await })
}

/// Wait until the backend has received `count` requests.
async fn wait_for_requests(backend: &MockBackend, count: usize) {
    for _ in 0..200 {
        if backend.requests().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("backend never received {} requests", count);
}

#[tokio::test]
async fn second_login_resolving_first_wins() {
    let backend = MockBackend::start().await;
    backend.on(
        "POST",
        "/auth/login/",
        login_ok(1, "doctor", 1).with_delay(Duration::from_millis(300)),
    );
    backend.on("POST", "/auth/login/", login_ok(2, "admin", 1));
    let (session, tokens) = session_for(&backend);
    session.initialize();

    let first = spawn_login(&session, "first");
    wait_for_requests(&backend, 1).await;
    let second = spawn_login(&session, "second");

    let second_identity = second.await.unwrap().unwrap();
    assert_eq!(second_identity.user_id, 2);

    let first_result = first.await.unwrap();
    assert!(matches!(first_result, Err(AuthError::Superseded)));

    let snapshot = session.snapshot();
    let identity = snapshot.identity().unwrap();
    assert_eq!(identity.user_id, 2);
    assert_eq!(identity.role, Some(Role::Admin));
    assert_eq!(
        tokens.load(),
        Some(TokenPair::new(access_token(2, "admin"), "refresh-2"))
    );
    assert_eq!(tokens.load_identity().map(|i| i.user_id), Some(2));
}

#[tokio::test]
async fn older_login_resolving_first_is_discarded() {
    let backend = MockBackend::start().await;
    backend.on(
        "POST",
        "/auth/login/",
        login_ok(1, "doctor", 1).with_delay(Duration::from_millis(150)),
    );
    backend.on(
        "POST",
        "/auth/login/",
        login_ok(2, "nurse", 1).with_delay(Duration::from_millis(400)),
    );
    let (session, tokens) = session_for(&backend);
    session.initialize();

    let first = spawn_login(&session, "first");
    wait_for_requests(&backend, 1).await;
    let second = spawn_login(&session, "second");

    assert!(matches!(first.await.unwrap(), Err(AuthError::Superseded)));
    // The stale result left nothing behind while the newer attempt is in flight.
    assert_eq!(session.snapshot(), SessionSnapshot::anonymous());
    assert_eq!(tokens.load(), None);

    let identity = second.await.unwrap().unwrap();
    assert_eq!(identity.user_id, 2);
    assert_eq!(session.snapshot(), SessionSnapshot::authenticated(identity));
}

#[tokio::test]
async fn newer_failure_beats_older_success() {
    let backend = MockBackend::start().await;
    backend.on(
        "POST",
        "/auth/login/",
        login_ok(1, "admin", 1).with_delay(Duration::from_millis(300)),
    );
    backend.on(
        "POST",
        "/auth/login/",
        MockResponse::json(401, json!({"detail": "Invalid credentials"})),
    );
    let (session, tokens) = session_for(&backend);
    session.initialize();

    let first = spawn_login(&session, "first");
    wait_for_requests(&backend, 1).await;
    let second = spawn_login(&session, "second");

    assert!(matches!(
        second.await.unwrap(),
        Err(AuthError::LoginRejected(msg)) if msg == "Invalid credentials"
    ));
    assert!(matches!(first.await.unwrap(), Err(AuthError::Superseded)));

    assert_eq!(session.snapshot().state, SessionState::Anonymous);
    assert_eq!(tokens.load(), None);
}

#[tokio::test]
async fn logout_during_login_wins() {
    let backend = MockBackend::start().await;
    backend.on(
        "POST",
        "/auth/login/",
        login_ok(1, "admin", 1).with_delay(Duration::from_millis(200)),
    );
    let (session, tokens) = session_for(&backend);
    session.initialize();

    let pending = spawn_login(&session, "admin1");
    wait_for_requests(&backend, 1).await;
    session.logout();

    assert!(matches!(pending.await.unwrap(), Err(AuthError::Superseded)));
    assert_eq!(session.snapshot(), SessionSnapshot::anonymous());
    assert_eq!(tokens.load(), None);
}
