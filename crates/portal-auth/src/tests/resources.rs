//! Resource endpoints through the session.

use super::harness::{login_ok, session_for, MockBackend, MockResponse};
use crate::{AuthError, Credentials, Resource, ResourceApi, SessionState, UpdateMode};
use serde_json::json;
use std::sync::Arc;

async fn signed_in(backend: &MockBackend) -> ResourceApi {
    backend.on("POST", "/auth/login/", login_ok(1, "admin", 1));
    let (session, _) = session_for(backend);
    session
        .login(&Credentials::new("admin1", "pw", "1"))
        .await
        .unwrap();
    ResourceApi::new(Arc::clone(&session))
}

#[tokio::test]
async fn list_with_filters() {
    let backend = MockBackend::start().await;
    backend.on(
        "GET",
        "/beds/?status=available",
        MockResponse::json(200, json!([{"id": 1, "status": "available"}])),
    );
    let api = signed_in(&backend).await;

    let params = vec![("status".to_string(), "available".to_string())];
    let beds = api.list(Resource::Beds, &params).await.unwrap();
    assert_eq!(beds[0]["id"], 1);
}

#[tokio::test]
async fn crud_uses_expected_methods() {
    let backend = MockBackend::start().await;
    backend.on("POST", "/patients/", MockResponse::json(201, json!({"id": 5})));
    backend.on("GET", "/patients/5/", MockResponse::json(200, json!({"id": 5})));
    backend.on("PUT", "/patients/5/", MockResponse::json(200, json!({"id": 5})));
    backend.on("PATCH", "/doctors/2/", MockResponse::json(200, json!({"id": 2})));
    backend.on("PUT", "/doctors/2/", MockResponse::json(200, json!({"id": 2})));
    backend.on("DELETE", "/patients/5/", MockResponse::empty(204));
    let api = signed_in(&backend).await;

    let created = api
        .create(Resource::Patients, json!({"first_name": "Ada"}))
        .await
        .unwrap();
    assert_eq!(created["id"], 5);
    assert_eq!(api.get(Resource::Patients, 5).await.unwrap()["id"], 5);

    api.update(Resource::Patients, 5, json!({"first_name": "Ada"}), UpdateMode::Partial)
        .await
        .unwrap();
    api.update(Resource::Doctors, 2, json!({"is_available": false}), UpdateMode::Partial)
        .await
        .unwrap();
    api.update(Resource::Doctors, 2, json!({"name": "Dr. B"}), UpdateMode::Full)
        .await
        .unwrap();
    assert_eq!(
        api.delete(Resource::Patients, 5).await.unwrap(),
        serde_json::Value::Null
    );

    let methods: Vec<(String, String)> = backend
        .requests()
        .into_iter()
        .filter(|r| r.path != "/auth/login/")
        .map(|r| (r.method, r.path))
        .collect();
    assert_eq!(
        methods,
        vec![
            ("POST".to_string(), "/patients/".to_string()),
            ("GET".to_string(), "/patients/5/".to_string()),
            ("PUT".to_string(), "/patients/5/".to_string()),
            ("PATCH".to_string(), "/doctors/2/".to_string()),
            ("PUT".to_string(), "/doctors/2/".to_string()),
            ("DELETE".to_string(), "/patients/5/".to_string()),
        ]
    );
}

#[tokio::test]
async fn search_stats_and_appointment_views() {
    let backend = MockBackend::start().await;
    backend.on("GET", "/staff/?search=ann", MockResponse::json(200, json!([])));
    backend.on(
        "GET",
        "/doctors/search/?search=card",
        MockResponse::json(200, json!([{"id": 3}])),
    );
    backend.on("GET", "/beds/stats/", MockResponse::json(200, json!({"total": 40})));
    backend.on("GET", "/appointments/today/", MockResponse::json(200, json!([])));
    backend.on("GET", "/appointments/upcoming/", MockResponse::json(200, json!([{"id": 8}])));
    let api = signed_in(&backend).await;

    api.search(Resource::Staff, "ann").await.unwrap();
    assert_eq!(api.search(Resource::Doctors, "card").await.unwrap()[0]["id"], 3);
    assert_eq!(api.stats(Resource::Beds).await.unwrap()["total"], 40);
    api.appointments_today().await.unwrap();
    assert_eq!(api.appointments_upcoming().await.unwrap()[0]["id"], 8);

    assert!(matches!(
        api.search(Resource::Beds, "icu").await,
        Err(AuthError::Unsupported(_))
    ));
}

#[tokio::test]
async fn rejected_resource_call_ends_session() {
    let backend = MockBackend::start().await;
    backend.on("GET", "/staff/stats/", MockResponse::json(401, json!({"detail": "expired"})));
    backend.on("POST", "/auth/login/", login_ok(1, "admin", 1));
    let (session, tokens) = session_for(&backend);
    session
        .login(&Credentials::new("admin1", "pw", "1"))
        .await
        .unwrap();
    let api = ResourceApi::new(session.clone());

    let err = api.stats(Resource::Staff).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(session.snapshot().state, SessionState::Anonymous);
    assert_eq!(tokens.load(), None);
}
