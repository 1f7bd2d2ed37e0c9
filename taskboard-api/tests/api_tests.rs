/// HTTP tests for the Taskboard API
///
/// These drive the full router (middleware included) against the
/// in-memory store:
/// - Account registration, login lockout and recovery
/// - Task creation, updates and listings
/// - Error envelopes and status codes

mod common;

use axum::http::StatusCode;
use common::TestContext;
use serde_json::json;

#[tokio::test]
async fn test_health_reports_store() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["database"], "connected");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_unknown_route_uses_envelope() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/api/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Route not found");
}

#[tokio::test]
async fn test_wrong_method_on_known_path_uses_envelope() {
    let ctx = TestContext::new();

    for (method, uri) in [
        ("GET", "/api/register"),
        ("GET", "/api/tasks"),
        ("DELETE", "/api/tasks/1"),
        ("POST", "/api/health"),
    ] {
        let (status, body) = ctx.send(method, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Route not found");
    }
}

#[tokio::test]
async fn test_register_returns_public_fields() {
    let ctx = TestContext::new();

    let body = ctx.register("ana").await;

    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["username"], "ana");
    assert_eq!(body["user"]["email"], "ana@example.com");
    assert_eq!(body["user"]["firstName"], "Test");
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["user"].get("recoveryAnswer").is_none());
}

#[tokio::test]
async fn test_register_validation_lists_fields() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .post(
            "/api/register",
            json!({ "email": "not-an-email", "username": "a", "password": "short" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"username"));
    assert!(fields.contains(&"password"));
}

#[tokio::test]
async fn test_register_validation_uses_request_keys() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .post(
            "/api/register",
            json!({ "email": "a@b", "username": "abc", "password": "secret123" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "firstName", "lastName", "recoveryAnswer"]);
}

fn registration_body(email: &str, username: &str) -> serde_json::Value {
    json!({
        "email": email,
        "username": username,
        "password": "secret123",
        "firstName": "Other",
        "lastName": "User",
        "recoveryAnswer": "blue"
    })
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let ctx = TestContext::new();
    ctx.register("ana").await;

    let (status, body) = ctx
        .post("/api/register", registration_body("other@example.com", "ana"))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Username is already taken");
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let ctx = TestContext::new();
    ctx.register("ana").await;

    let (status, body) = ctx
        .post("/api/register", registration_body("ana@example.com", "ana_two"))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email is already registered");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let ctx = TestContext::new();

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/login")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(ctx.app.clone(), request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_by_username_and_email() {
    let ctx = TestContext::new();
    ctx.register("ana").await;

    for identifier in ["ana", "ana@example.com"] {
        let (status, body) = ctx
            .post(
                "/api/login",
                json!({ "email": identifier, "password": "secret123" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", identifier);
        assert_eq!(body["user"]["username"], "ana");
    }
}

#[tokio::test]
async fn test_login_lockout_after_five_failures() {
    let ctx = TestContext::new();
    ctx.register("ana").await;

    for _ in 0..5 {
        let (status, body) = ctx
            .post("/api/login", json!({ "email": "ana", "password": "wrong999" }))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Incorrect username/email or password");
        assert!(body.get("remainingTime").is_none());
    }

    // Locked even with the right password
    let (status, body) = ctx
        .post("/api/login", json!({ "email": "ana", "password": "secret123" }))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let remaining = body["remainingTime"].as_u64().unwrap();
    assert!(remaining > 290_000 && remaining <= 300_000);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Account locked due to multiple failed attempts"));
}

#[tokio::test]
async fn test_unknown_account_matches_wrong_password() {
    let ctx = TestContext::new();
    ctx.register("ana").await;

    let (unknown_status, unknown) = ctx
        .post("/api/login", json!({ "email": "ghost", "password": "secret123" }))
        .await;
    let (wrong_status, wrong) = ctx
        .post("/api/login", json!({ "email": "ana", "password": "wrong999" }))
        .await;

    assert_eq!(unknown_status, wrong_status);
    assert_eq!(unknown, wrong);
}

#[tokio::test]
async fn test_recovery_changes_password() {
    let ctx = TestContext::new();
    ctx.register("ana").await;

    let (status, _) = ctx
        .post(
            "/api/recovery",
            json!({ "email": "ana@example.com", "recoveryAnswer": "red", "password": "newpass99" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = ctx
        .post(
            "/api/recovery",
            json!({ "email": "ana@example.com", "recoveryAnswer": "blue", "password": "newpass99" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password recovered successfully");

    let (old, _) = ctx
        .post("/api/login", json!({ "email": "ana", "password": "secret123" }))
        .await;
    let (new, _) = ctx
        .post("/api/login", json!({ "email": "ana", "password": "newpass99" }))
        .await;
    assert_eq!(old, StatusCode::UNAUTHORIZED);
    assert_eq!(new, StatusCode::OK);
}

#[tokio::test]
async fn test_create_task_response_shape() {
    let ctx = TestContext::new();
    ctx.register("bob").await;

    let (status, body) = ctx
        .post(
            "/api/tasks",
            json!({
                "titulo": "Write report",
                "usernameAsignado": "bob",
                "prioridad": "alta",
                "fechaVencimiento": "2030-01-31",
                "asignadoPor": "ana"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["tarea"]["titulo"], "Write report");
    assert_eq!(body["tarea"]["prioridad"], "alta");
    assert_eq!(body["tarea"]["estado"], "pendiente");
    assert_eq!(body["asignacion"]["idTarea"], body["tarea"]["id"]);
    assert_eq!(body["asignacion"]["esPrioridad"], false);
    assert_eq!(body["usuarioAsignado"]["username"], "bob");
    assert_eq!(ctx.store.task_count(), 1);
}

#[tokio::test]
async fn test_create_task_unknown_assignee() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .post(
            "/api/tasks",
            json!({ "titulo": "Orphan", "usernameAsignado": "ghost" }),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Assigned user not found");
    assert_eq!(ctx.store.task_count(), 0);
}

#[tokio::test]
async fn test_create_task_rejects_unknown_priority() {
    let ctx = TestContext::new();
    ctx.register("bob").await;

    let (status, body) = ctx
        .post(
            "/api/tasks",
            json!({ "titulo": "Write report", "usernameAsignado": "bob", "prioridad": "urgente" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "prioridad");
}

#[tokio::test]
async fn test_create_task_validation_uses_request_keys() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .post("/api/tasks", json!({ "fechaVencimiento": "nope" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["fechaVencimiento", "titulo", "usernameAsignado"]);
}

#[tokio::test]
async fn test_update_task_and_reassign() {
    let ctx = TestContext::new();
    ctx.register("bob").await;
    ctx.register("carla").await;
    let id = ctx.create_task("Draft", "bob").await;

    let (status, body) = ctx
        .patch(
            &format!("/api/tasks/{}", id),
            json!({ "titulo": "Final", "usernameAsignado": "carla" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tarea"]["titulo"], "Final");
    assert!(body["asignacion"].is_object());

    let (_, carla) = ctx.get("/api/tasks/assignedToUser/carla").await;
    let (_, bob) = ctx.get("/api/tasks/assignedToUser/bob").await;
    assert_eq!(carla["totalTareas"], 1);
    assert_eq!(bob["totalTareas"], 0);
}

#[tokio::test]
async fn test_update_missing_task_and_bad_id() {
    let ctx = TestContext::new();

    let (missing, body) = ctx.patch("/api/tasks/999", json!({ "titulo": "X" })).await;
    assert_eq!(missing, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Task not found");

    let (bad, body) = ctx.patch("/api/tasks/abc", json!({ "titulo": "X" })).await;
    assert_eq!(bad, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_listings_by_user() {
    let ctx = TestContext::new();
    ctx.register("bob").await;
    ctx.create_task("First", "bob").await;
    ctx.create_task("Second", "bob").await;

    let (status, created) = ctx.get("/api/tasks/createdByUser/ana").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(created["message"], "User not found");

    let (status, assigned) = ctx.get("/api/tasks/assignedToUser/bob").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assigned["usuario"]["username"], "bob");
    assert_eq!(assigned["totalTareas"], 2);
    assert_eq!(assigned["tareasAsignadas"][0]["tarea"]["titulo"], "Second");
    assert!(assigned["tareasAsignadas"][0]["asignacion"]["idUser"].is_string());
}

#[tokio::test]
async fn test_created_by_user_listing() {
    let ctx = TestContext::new();
    ctx.register("ana").await;
    ctx.register("bob").await;
    ctx.create_task("First", "bob").await;

    let (status, body) = ctx.get("/api/tasks/createdByUser/ana").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalTareas"], 1);
    assert_eq!(body["tareas"][0]["asignadoPor"], "ana");
}

#[tokio::test]
async fn test_priority_toggle_and_listing() {
    let ctx = TestContext::new();
    ctx.register("bob").await;
    let id = ctx.create_task("Urgent", "bob").await;
    ctx.create_task("Later", "bob").await;

    let (status, body) = ctx
        .patch(&format!("/api/tasks/priority/{}", id), json!({ "username": "bob" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["asignacionActualizada"]["esPrioridad"], true);

    let (status, body) = ctx.get("/api/tasks/priority/bob").await;
    assert_eq!(status, StatusCode::OK);
    let listed = body["tareasPrioritarias"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["titulo"], "Urgent");
    assert_eq!(listed[0]["esPrioridad"], true);

    // Second toggle clears the flag
    let (_, body) = ctx
        .patch(&format!("/api/tasks/priority/{}", id), json!({ "username": "bob" }))
        .await;
    assert_eq!(body["asignacionActualizada"]["esPrioridad"], false);
}

#[tokio::test]
async fn test_priority_toggle_without_assignment() {
    let ctx = TestContext::new();
    ctx.register("bob").await;
    ctx.register("carla").await;
    let id = ctx.create_task("Urgent", "bob").await;

    let (status, body) = ctx
        .patch(&format!("/api/tasks/priority/{}", id), json!({ "username": "carla" }))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No assignment found for this task and user");
}

#[tokio::test]
async fn test_note_set_and_clear() {
    let ctx = TestContext::new();
    ctx.register("bob").await;
    let id = ctx.create_task("Draft", "bob").await;
    let uri = format!("/api/tasks/note/{}", id);

    let (status, body) = ctx.patch(&uri, json!({ "nota": "call the client" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tarea"]["nota"], "call the client");

    // A missing key leaves the note untouched
    let (status, body) = ctx.patch(&uri, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tarea"]["nota"], "call the client");

    let (status, body) = ctx.patch(&uri, json!({ "nota": null })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["tarea"]["nota"].is_null());
}

#[tokio::test]
async fn test_status_update() {
    let ctx = TestContext::new();
    ctx.register("bob").await;
    let id = ctx.create_task("Draft", "bob").await;
    let uri = format!("/api/tasks/status/{}", id);

    let (status, body) = ctx.patch(&uri, json!({ "estado": "completada" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tarea"]["estado"], "completada");

    let (status, body) = ctx.patch(&uri, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "estado");

    let (status, body) = ctx.patch(&uri, json!({ "estado": "archivada" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "estado");
}

#[tokio::test]
async fn test_security_headers_present() {
    let ctx = TestContext::new();

    let request = axum::http::Request::builder()
        .uri("/api/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(ctx.app.clone(), request)
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
    assert!(response.headers().get("strict-transport-security").is_none());
}
