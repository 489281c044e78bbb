//! RPC handlers (C8): the `Handlers.PostUpdates` unary method, applying the
//! same pipeline stages (C6) as the HTTP surface, then the same atomic batch
//! update (spec.md §4.7).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tonic::{Request, Response, Status};

use crate::model::Data;
use crate::pb::handlers_server::Handlers;
use crate::pb::{PostUpdatesRequest, PostUpdatesResponse};
use crate::server::pipeline::{self, PipelineError};
use crate::server::state::ServerState;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

pub struct RpcHandlers {
    state: Arc<ServerState>,
}

impl RpcHandlers {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    /// The actual `PostUpdates` logic, factored out so `post_updates` can
    /// wrap it with the request-id/duration/status logging step 1 of
    /// spec.md §4.5 requires on every transport.
    async fn handle_post_updates(
        &self,
        request: Request<PostUpdatesRequest>,
    ) -> Result<Response<PostUpdatesResponse>, Status> {
        let metadata = request.metadata().clone();

        let real_ip = metadata_str(&metadata, "x-real-ip");
        pipeline::check_trusted_subnet(self.state.trusted_subnet.as_ref(), real_ip)
            .map_err(pipeline_err_to_status)?;

        let body = request.into_inner().metrics;

        let provided_hash = metadata_str(&metadata, "hashsha256");
        pipeline::verify_request_hash(self.state.hash_key.as_deref(), &body, provided_hash)
            .map_err(pipeline_err_to_status)?;

        let decrypted = pipeline::decrypt_request_body(self.state.private_key.as_ref(), body)
            .map_err(pipeline_err_to_status)?;

        // Validation failures and storage failures both map to Internal
        // per spec.md §4.7.
        let batch: Vec<Data> = serde_json::from_slice(&decrypted)
            .map_err(|e| Status::internal(format!("malformed metrics payload: {e}")))?;

        for item in &batch {
            item.validate()
                .map_err(|e| Status::internal(format!("invalid metric: {e}")))?;
        }

        self.state
            .storage
            .update_batch(batch)
            .await
            .map_err(|e| Status::internal(format!("storage error: {e}")))?;

        Ok(Response::new(PostUpdatesResponse {}))
    }
}

fn pipeline_err_to_status(err: PipelineError) -> Status {
    match err {
        PipelineError::Forbidden(msg) => Status::permission_denied(msg),
        PipelineError::BadRequest(msg) => Status::invalid_argument(msg),
    }
}

fn metadata_str<'a>(metadata: &'a tonic::metadata::MetadataMap, key: &str) -> Option<&'a str> {
    metadata.get(key).and_then(|v| v.to_str().ok())
}

#[tonic::async_trait]
impl Handlers for RpcHandlers {
    /// Request id / logging (spec.md §4.5 step 1), realized the same way
    /// `http/middleware.rs`'s `pipeline_middleware` does for HTTP: assign a
    /// per-request id, run the handler, then log rpc name/duration/status.
    async fn post_updates(
        &self,
        request: Request<PostUpdatesRequest>,
    ) -> Result<Response<PostUpdatesResponse>, Status> {
        let request_id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        let result = self.handle_post_updates(request).await;

        let status_code = result
            .as_ref()
            .map(|_| tonic::Code::Ok)
            .unwrap_or_else(|status| status.code());
        tracing::info!(
            request_id,
            rpc = "PostUpdates",
            status = ?status_code,
            duration_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );

        result
    }
}
