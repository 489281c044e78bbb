//! Router-level integration tests, grounded on the teacher's
//! `api/tests.rs` (`tower::ServiceExt::oneshot` against the real `Router`
//! instead of calling handlers directly), adapted to `MemoryStorage` so no
//! database is required.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use super::create_router;
use crate::server::state::ServerState;
use crate::storage::MemoryStorage;

fn test_app() -> axum::Router {
    let state = Arc::new(ServerState::new(Arc::new(MemoryStorage::new()), None, None, None));
    create_router(state)
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn ping_reports_ok_when_storage_is_healthy() {
    let app = test_app();
    let response = app
        .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn index_returns_no_content_when_empty() {
    let app = test_app();
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn update_path_then_value_path_round_trips() {
    let app = test_app();

    let update = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/update/counter/PollCount/3")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(update.status(), StatusCode::OK);

    let value = app
        .oneshot(
            Request::builder()
                .uri("/value/counter/PollCount")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(value.status(), StatusCode::OK);
    assert_eq!(read_json(value).await, serde_json::json!(3));
}

#[tokio::test]
async fn value_path_gauge_whole_number_has_no_trailing_zero() {
    let app = test_app();

    let update = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/update/gauge/Alloc/99")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(update.status(), StatusCode::OK);

    let value = app
        .oneshot(
            Request::builder()
                .uri("/value/gauge/Alloc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = axum::body::to_bytes(value.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(body.as_ref(), b"99");
}

#[tokio::test]
async fn value_path_404s_for_unknown_metric() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/value/gauge/Nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_json_rejects_malformed_metric() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/update")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({"type": "gauge", "id": "Alloc"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_json_rejects_unknown_metric_type() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/update")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({"type": "histogram", "id": "Alloc", "value": 1.0})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_json_rejects_syntactically_invalid_body() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/update")
                .header("Content-Type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn updates_batch_rejects_wrong_field_type() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/updates")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!([{"type": "counter", "id": "c", "delta": "not-a-number"}])
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn updates_batch_rejects_empty_array() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/updates")
                .header("Content-Type", "application/json")
                .body(Body::from("[]"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
