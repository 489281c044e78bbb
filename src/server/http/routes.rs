use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::server::state::ServerState;

use super::{handlers, middleware as mw};

/// Wires the route table from spec.md §4.6 and wraps the whole router with
/// the shared ingress/egress pipeline (spec.md §4.5).
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/update/:type/:name/:value", post(handlers::update_path))
        .route("/update", post(handlers::update_json))
        .route("/updates", post(handlers::update_batch))
        .route("/value/:type/:name", get(handlers::value_path))
        .route("/value", post(handlers::value_json))
        .route("/", get(handlers::index))
        .route("/ping", get(handlers::ping))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            mw::pipeline_middleware,
        ))
        .with_state(state)
}
