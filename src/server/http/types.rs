use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::model::{MetricKind, ValidationError};
use crate::server::pipeline::PipelineError;

/// Mirrors the teacher's `ApiError` shape: one error enum per handler
/// surface, mapped to HTTP status in `IntoResponse` (spec.md §6).
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("storage error: {0}")]
    Storage(#[from] crate::storage::Error),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Forbidden(msg) => ApiError::Forbidden(msg),
            PipelineError::BadRequest(msg) => ApiError::BadRequest(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage error".to_string(),
            ),
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

/// A `Json<T>` stand-in that rejects straight into `ApiError::BadRequest`
/// instead of axum's built-in `JsonRejection` (422, axum's own error body).
/// Malformed JSON and schema mismatches (unknown `type`, wrong field type)
/// both surface here, so every JSON-body route maps them to spec.md §8's
/// "Malformed JSON → 400" / "Unknown metric type → 400" instead of only the
/// path-form endpoint catching them.
pub struct ValidJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = axum::body::Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let value = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::BadRequest(format!("malformed JSON: {e}")))?;
        Ok(ValidJson(value))
    }
}

/// `POST /value` and `GET /value/{type}/{name}` identity payload.
#[derive(Debug, Deserialize)]
pub struct MetricIdentity {
    #[serde(rename = "type")]
    pub kind: MetricKind,
    #[serde(rename = "id")]
    pub name: String,
}

/// `GET /value/{type}/{name}`'s bare-scalar reply. Serialized by hand rather
/// than `#[serde(untagged)]` so the gauge arm shares `Data::value`'s
/// Go-style whole-number formatting (spec.md §8 S1/S2: `7`, not `7.0`).
#[derive(Debug)]
pub enum ScalarValue {
    Gauge(f64),
    Counter(i64),
}

impl Serialize for ScalarValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            ScalarValue::Gauge(v) => crate::model::serialize_go_float(v, serializer),
            ScalarValue::Counter(v) => serializer.serialize_i64(*v),
        }
    }
}
