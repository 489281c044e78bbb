//! HTTP handlers (C7), one per route in spec.md §4.6. Grounded on the
//! teacher's `api/handlers.rs` shape (`State<Arc<T>>` + `Result<_, ApiError>`)
//! and on `original_source/internal/server/api/handlers.go`'s per-route
//! behavior for the ambiguous bits (e.g. `GET /` marshals JSON but sets
//! `Content-Type: text/html`).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::model::{Data, MetricKind};
use crate::server::state::ServerState;

use super::types::{ApiError, MetricIdentity, ScalarValue, ValidJson};

/// `POST /update/{type}/{name}/{value}`
pub async fn update_path(
    State(state): State<Arc<ServerState>>,
    Path((kind, name, value)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    let data = parse_path_update(&kind, &name, &value)?;
    state.storage.update(data).await?;
    Ok(StatusCode::OK)
}

fn parse_path_update(kind: &str, name: &str, value: &str) -> Result<Data, ApiError> {
    if name.is_empty() {
        return Err(ApiError::BadRequest("metric name must not be empty".into()));
    }
    let data = match kind {
        "counter" => {
            let delta: i64 = value
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("invalid counter value {value:?}")))?;
            Data::counter(name, delta)
        }
        "gauge" => {
            let value: f64 = value
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("invalid gauge value {value:?}")))?;
            Data::gauge(name, value)
        }
        other => return Err(ApiError::BadRequest(format!("unknown metric type {other:?}"))),
    };
    Ok(data)
}

/// `POST /update` (single JSON record)
pub async fn update_json(
    State(state): State<Arc<ServerState>>,
    ValidJson(data): ValidJson<Data>,
) -> Result<StatusCode, ApiError> {
    data.validate()?;
    state.storage.update(data).await?;
    Ok(StatusCode::OK)
}

/// `POST /updates` (JSON array, atomic batch)
pub async fn update_batch(
    State(state): State<Arc<ServerState>>,
    ValidJson(batch): ValidJson<Vec<Data>>,
) -> Result<StatusCode, ApiError> {
    if batch.is_empty() {
        return Err(ApiError::BadRequest("batch must not be empty".into()));
    }
    for item in &batch {
        item.validate()?;
    }
    state.storage.update_batch(batch).await?;
    Ok(StatusCode::OK)
}

/// `GET /value/{type}/{name}`
pub async fn value_path(
    State(state): State<Arc<ServerState>>,
    Path((_kind, name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let data = state.storage.read(&name).await?.ok_or(ApiError::NotFound)?;
    let scalar = match data.kind {
        MetricKind::Counter => ScalarValue::Counter(data.delta.unwrap_or(0)),
        MetricKind::Gauge => ScalarValue::Gauge(data.value.unwrap_or(0.0)),
    };
    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        Json(scalar),
    )
        .into_response())
}

/// `POST /value` (identity JSON body)
pub async fn value_json(
    State(state): State<Arc<ServerState>>,
    ValidJson(identity): ValidJson<MetricIdentity>,
) -> Result<Json<Data>, ApiError> {
    let data = state
        .storage
        .read(&identity.name)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(data))
}

/// `GET /` — mirrors `original_source`'s `IndexGet`: JSON-marshaled body,
/// `text/html` content type, 204 when storage is empty.
pub async fn index(State(state): State<Arc<ServerState>>) -> Result<Response, ApiError> {
    let data = state.storage.read_all().await?;
    if data.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let body = serde_json::to_vec(&data).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "text/html")], body).into_response())
}

/// `GET /ping`
pub async fn ping(State(state): State<Arc<ServerState>>) -> StatusCode {
    match state.storage.ping().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_path_update_accepts_counter() {
        let data = parse_path_update("counter", "PollCount", "3").unwrap();
        assert_eq!(data.delta, Some(3));
    }

    #[test]
    fn parse_path_update_accepts_gauge() {
        let data = parse_path_update("gauge", "Alloc", "12.5").unwrap();
        assert_eq!(data.value, Some(12.5));
    }

    #[test]
    fn parse_path_update_rejects_unknown_type() {
        assert!(parse_path_update("histogram", "x", "1").is_err());
    }

    #[test]
    fn parse_path_update_rejects_non_numeric_value() {
        assert!(parse_path_update("counter", "c", "not-a-number").is_err());
    }
}
