//! HTTP endpoint tests: authorization, job CRUD and notification intake.

mod common;

use axum::http::{Method, StatusCode};
use beacon_events::BrokerEvent;
use chrono::{Duration, Utc};
use serde_json::json;

use common::{body_json, send, token, TestApp};

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = TestApp::new();
    let response = send(app.router(), Method::GET, "/api/v1/jobs", None, None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn invalid_token_is_unauthorized() {
    let app = TestApp::new();
    let response = send(app.router(), Method::GET, "/api/v1/jobs", Some("garbage"), None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_admin_is_forbidden() {
    let app = TestApp::new();
    let user = token(2, "user");
    let response = send(app.router(), Method::GET, "/api/v1/jobs", Some(&user), None).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_then_get_list_and_delete_job() {
    let app = TestApp::new();
    let admin = token(1, "admin");
    let mut events = app.bus.subscribe();

    let response = send(
        app.router(),
        Method::POST,
        "/api/v1/jobs",
        Some(&admin),
        Some(json!({ "name": "notify", "input_data": { "text": "hi" } })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await["data"].clone();
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["name"], "notify");
    assert_eq!(created["status_id"], 1);
    assert_eq!(events.recv().await.unwrap(), BrokerEvent::JobCreated(Some(id)));

    let uri = format!("/api/v1/jobs/{id}");
    let response = send(app.router(), Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["input_data"]["text"], "hi");

    let response = send(app.router(), Method::GET, "/api/v1/jobs", Some(&admin), None).await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);

    let response = send(app.router(), Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(app.router(), Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_job_defaults_input_and_window() {
    let app = TestApp::new();
    let admin = token(1, "admin");

    let response = send(
        app.router(),
        Method::POST,
        "/api/v1/jobs",
        Some(&admin),
        Some(json!({ "name": "cleanup" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let job = &app.jobs.all()[0];
    assert_eq!(job.input_data, json!({}));
    assert_eq!(job.valid_until - job.scheduled_for, Duration::hours(1));
}

#[tokio::test]
async fn create_job_rejects_inverted_window() {
    let app = TestApp::new();
    let admin = token(1, "admin");
    let now = Utc::now();

    let response = send(
        app.router(),
        Method::POST,
        "/api/v1/jobs",
        Some(&admin),
        Some(json!({
            "name": "notify",
            "scheduled_for": now + Duration::hours(2),
            "valid_until": now + Duration::hours(1),
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert!(app.jobs.all().is_empty());
}

#[tokio::test]
async fn create_job_rejects_empty_name() {
    let app = TestApp::new();
    let admin = token(1, "admin");

    let response = send(
        app.router(),
        Method::POST,
        "/api/v1/jobs",
        Some(&admin),
        Some(json!({ "name": "" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_unknown_job_is_not_found() {
    let app = TestApp::new();
    let admin = token(1, "admin");

    let response = send(app.router(), Method::DELETE, "/api/v1/jobs/404", Some(&admin), None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[tokio::test]
async fn immediate_notification_returns_its_id() {
    let app = TestApp::new();
    let admin = token(1, "admin");
    let mut events = app.bus.subscribe();

    let response = send(
        app.router(),
        Method::POST,
        "/api/v1/notifications",
        Some(&admin),
        Some(json!({ "text": "Deploy finished", "user_id": 4 })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let data = body_json(response).await["data"].clone();
    let id = data["notification_id"].as_str().unwrap().to_string();
    assert_eq!(events.recv().await.unwrap(), BrokerEvent::Notification(id));
}

#[tokio::test]
async fn future_notification_returns_a_job_id() {
    let app = TestApp::new();
    let admin = token(1, "admin");

    let response = send(
        app.router(),
        Method::POST,
        "/api/v1/notifications",
        Some(&admin),
        Some(json!({ "text": "Reminder", "send_at": Utc::now() + Duration::days(1) })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let data = body_json(response).await["data"].clone();
    assert!(data["job_id"].is_i64());
    assert_eq!(app.jobs.all().len(), 1);
}

#[tokio::test]
async fn notification_with_both_targets_is_rejected() {
    let app = TestApp::new();
    let admin = token(1, "admin");

    let response = send(
        app.router(),
        Method::POST,
        "/api/v1/notifications",
        Some(&admin),
        Some(json!({ "text": "x", "user_id": 1, "role_id": 2 })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn notification_beyond_calendar_range_is_rejected() {
    let app = TestApp::new();
    let admin = token(1, "admin");

    let response = send(
        app.router(),
        Method::POST,
        "/api/v1/notifications",
        Some(&admin),
        Some(json!({ "text": "x", "send_at": "+262142-12-31T23:59:59Z" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert!(app.jobs.all().is_empty());
}

#[tokio::test]
async fn job_beyond_calendar_range_is_rejected() {
    let app = TestApp::new();
    let admin = token(1, "admin");

    let response = send(
        app.router(),
        Method::POST,
        "/api/v1/jobs",
        Some(&admin),
        Some(json!({ "name": "notify", "scheduled_for": "+262142-12-31T23:59:59Z" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.jobs.all().is_empty());
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_degraded_without_database() {
    let app = TestApp::new();
    let response = send(app.router(), Method::GET, "/health", None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["db_healthy"], false);
    assert_eq!(json["connections"], 0);
    assert_eq!(json["authenticated"], 0);
    assert_eq!(json["secure_connections"], 0);
}
