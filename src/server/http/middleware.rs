//! HTTP realization of the shared pipeline (spec.md §4.5): one `axum`
//! middleware function running subnet/hash/decrypt ahead of the handler and
//! compression/signing on the way back out, so the untrusted body is read
//! exactly once and restored identically for the handler (spec.md: "every
//! step that reads the body must restore it to an identical readable
//! sequence for downstream steps").

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::info;

use crate::server::pipeline;
use crate::server::state::ServerState;

use super::types::ApiError;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

const HEADER_REAL_IP: &str = "x-real-ip";
const HEADER_HASH: &str = "HashSHA256";

pub async fn pipeline_middleware(
    State(state): State<Arc<ServerState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let request_id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let accept = header_str(req.headers(), axum::http::header::ACCEPT);
    let accept_encoding = header_str(req.headers(), axum::http::header::ACCEPT_ENCODING);

    let response = match run_ingress(&state, req).await {
        Ok(req) => next.run(req).await,
        Err(err) => err.into_response(),
    };

    let response = run_egress(&state, &accept, &accept_encoding, response).await;

    info!(
        request_id,
        %method,
        path,
        status = response.status().as_u16(),
        duration_ms = started.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}

async fn run_ingress(state: &ServerState, req: Request<Body>) -> Result<Request<Body>, ApiError> {
    let (parts, body) = req.into_parts();

    let real_ip = parts
        .headers
        .get(HEADER_REAL_IP)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    pipeline::check_trusted_subnet(state.trusted_subnet.as_ref(), real_ip.as_deref())?;

    let body_bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let provided_hash = parts
        .headers
        .get(HEADER_HASH)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    pipeline::verify_request_hash(
        state.hash_key.as_deref(),
        &body_bytes,
        provided_hash.as_deref(),
    )?;

    let decrypted =
        pipeline::decrypt_request_body(state.private_key.as_ref(), body_bytes.to_vec())?;

    Ok(Request::from_parts(parts, Body::from(decrypted)))
}

async fn run_egress(
    state: &ServerState,
    accept: &str,
    accept_encoding: &str,
    response: Response,
) -> Response {
    let (mut parts, body) = response.into_parts();
    let body_bytes = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(_) => return Response::from_parts(parts, Body::empty()),
    };

    let wants_gzip = (accept.contains("application/json") || accept.contains("text/html"))
        && accept_encoding.contains("gzip");

    let final_bytes = if wants_gzip {
        match gzip(&body_bytes) {
            Ok(compressed) => {
                parts.headers.insert(
                    axum::http::header::CONTENT_ENCODING,
                    HeaderValue::from_static("gzip"),
                );
                compressed
            }
            Err(_) => body_bytes.to_vec(),
        }
    } else {
        body_bytes.to_vec()
    };

    if let Some(sig) = pipeline::sign_response_body(state.hash_key.as_deref(), &final_bytes) {
        if let Ok(value) = HeaderValue::from_str(&sig) {
            parts
                .headers
                .insert(HeaderName::from_static("hashsha256"), value);
        }
    }

    Response::from_parts(parts, Body::from(final_bytes))
}

fn header_str(headers: &axum::http::HeaderMap, name: axum::http::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    encoder.finish()
}
