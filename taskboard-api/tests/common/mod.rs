/// Common test utilities for HTTP tests
///
/// Builds the full router on an in-memory store with a cheap password
/// hasher, and drives it with `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::{Config, HashingConfig};
use taskboard_shared::auth::password::Argon2Hasher;
use taskboard_shared::store::memory::MemoryStore;
use tower::ServiceExt;

/// Test context containing the router and its store
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: axum::Router,
}

impl TestContext {
    pub fn new() -> Self {
        let mut config = Config::from_lookup(|_| None).expect("default config");
        config.hashing = HashingConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        };

        let store = Arc::new(MemoryStore::new());
        let hasher = Argon2Hasher::new(config.hashing.into()).expect("hasher");
        let app = build_router(AppState::new(store.clone(), Arc::new(hasher), config));

        TestContext { store, app }
    }

    /// Sends a request and returns the status with the parsed JSON body
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("PATCH", uri, Some(body)).await
    }

    /// Registers `username` with password `secret123` and answer `blue`
    pub async fn register(&self, username: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/register",
                json!({
                    "email": format!("{}@example.com", username),
                    "username": username,
                    "password": "secret123",
                    "firstName": "Test",
                    "lastName": "User",
                    "recoveryAnswer": "blue"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body
    }

    /// Creates a task assigned to `assignee` and returns its id
    pub async fn create_task(&self, title: &str, assignee: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/tasks",
                json!({
                    "titulo": title,
                    "usernameAsignado": assignee,
                    "asignadoPor": "ana"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
        body["tarea"]["id"].as_i64().unwrap()
    }
}
