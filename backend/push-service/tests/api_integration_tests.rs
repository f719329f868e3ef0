//! Integration tests for push-service HTTP API
//!
//! This test module covers:
//! - Notification injection for connected and offline users
//! - Connection status, metrics and user listing endpoints
//! - Error response format

use actix_web::{http::StatusCode, test, web, App};
use push_service::{configure_routes, AppState, Channel, Config, UserId};
use serde_json::{json, Value};

fn user(raw: &str) -> UserId {
    UserId::parse(raw).unwrap()
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn test_health_endpoint() {
    let state = AppState::new(Config::default());
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert_eq!(body, "OK");
}

#[actix_web::test]
async fn test_notify_offline_user_is_accepted_and_dropped() {
    let state = AppState::new(Config::default());
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/notify/u2")
        .set_json(json!({"type": "order_shipped", "id": 42}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user_id"], "u2");
    assert_eq!(body["connected"], false);
    assert_eq!(body["attempted"], 0);
}

#[actix_web::test]
async fn test_notify_delivers_body_verbatim() {
    let state = AppState::new(Config::default());
    let (c1, mut rx1) = Channel::open();
    let (c2, mut rx2) = Channel::open();
    state.registry.register(&user("u1"), c1);
    state.registry.register(&user("u1"), c2);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/notify/u1")
        .set_json(json!({"type": "order_shipped"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["connected"], true);
    assert_eq!(body["attempted"], 2);
    assert_eq!(body["delivered"], 2);
    assert_eq!(body["failed"], 0);

    assert_eq!(rx1.recv().await.as_deref(), Some(r#"{"type":"order_shipped"}"#));
    assert_eq!(rx2.recv().await.as_deref(), Some(r#"{"type":"order_shipped"}"#));
}

#[actix_web::test]
async fn test_notify_reports_failed_channels() {
    let state = AppState::new(Config::default());
    let (dead, dead_rx) = Channel::open();
    let (live, mut live_rx) = Channel::open();
    state.registry.register(&user("u1"), dead);
    state.registry.register(&user("u1"), live);
    drop(dead_rx);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/notify/u1")
        .set_json(json!({"type": "invoice_issued"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["attempted"], 2);
    assert_eq!(body["delivered"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(live_rx.recv().await.as_deref(), Some(r#"{"type":"invoice_issued"}"#));
}

#[actix_web::test]
async fn test_notify_rejects_invalid_json() {
    let state = AppState::new(Config::default());
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/notify/u1")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "INVALID_PAYLOAD");
}

#[actix_web::test]
async fn test_notify_rejects_wrong_content_type() {
    let state = AppState::new(Config::default());
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/notify/u1")
        .insert_header(("content-type", "text/plain"))
        .set_payload(r#"{"type":"order_shipped"}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "BAD_REQUEST");
}

#[actix_web::test]
async fn test_notify_rejects_blank_user_id() {
    let state = AppState::new(Config::default());
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/notify/%20")
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "INVALID_USER_ID");
}

#[actix_web::test]
async fn test_broadcast_reaches_every_user() {
    let state = AppState::new(Config::default());
    let (c1, mut rx1) = Channel::open();
    let (c2, mut rx2) = Channel::open();
    state.registry.register(&user("u1"), c1);
    state.registry.register(&user("u2"), c2);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/broadcast")
        .set_json(json!({"type": "maintenance"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["delivered"], 2);
    assert_eq!(rx1.recv().await.as_deref(), Some(r#"{"type":"maintenance"}"#));
    assert_eq!(rx2.recv().await.as_deref(), Some(r#"{"type":"maintenance"}"#));
}

#[actix_web::test]
async fn test_status_metrics_and_users() {
    let state = AppState::new(Config::default());
    let mut receivers = Vec::new();
    for raw in ["u1", "u1", "u2"] {
        let (channel, rx) = Channel::open();
        state.registry.register(&user(raw), channel);
        receivers.push(rx);
    }
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/api/v1/ws/status/u1").to_request();
    let status: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(status["connected"], true);
    assert_eq!(status["connection_count"], 2);

    let req = test::TestRequest::get().uri("/api/v1/ws/status/nobody").to_request();
    let status: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(status["connected"], false);
    assert_eq!(status["connection_count"], 0);

    let req = test::TestRequest::get().uri("/api/v1/ws/metrics").to_request();
    let metrics: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(metrics["total_connections"], 3);
    assert_eq!(metrics["connected_users"], 2);
    assert_eq!(metrics["average_connections_per_user"], 1.5);

    let req = test::TestRequest::get().uri("/api/v1/ws/users").to_request();
    let users: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(users["count"], 2);
    assert_eq!(users["users"], json!(["u1", "u2"]));
}

#[actix_web::test]
async fn test_shutdown_clears_registry() {
    let state = AppState::new(Config::default());
    let (channel, _rx) = Channel::open();
    state.registry.register(&user("u1"), channel);

    assert_eq!(state.shutdown(), 1);
    assert_eq!(state.registry.total_connections(), 0);
}
