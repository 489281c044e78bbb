//! Agent (C4/C5): host metric sampling and reporting to the server.

pub mod client;
pub mod netutils;
pub mod reporter;
pub mod sampler;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::AgentSettings;
use crate::crypto;
use client::{HttpPoster, Poster, RpcPoster};
use reporter::Reporter;
use sampler::Sampler;

/// Builds the reporter per the agent's settings: picks HTTP or RPC transport
/// (spec.md §4.4 "client selection"), loads the optional public key once,
/// and wires the sampler.
pub async fn build_reporter(
    settings: &AgentSettings,
    cancel: CancellationToken,
) -> anyhow::Result<Reporter> {
    let client: Arc<dyn Poster> = if settings.use_grpc {
        let endpoint = format!("http://{}:{}", host_only(&settings.address), settings.grpc_port);
        Arc::new(RpcPoster::connect(endpoint, cancel.clone()).await?)
    } else {
        Arc::new(HttpPoster::new(format!("http://{}", settings.address), cancel.clone()))
    };

    let crypto_key = match &settings.crypto_key {
        Some(path) => Some(crypto::load_public_key(path).await?),
        None => None,
    };

    Ok(Reporter::new(
        client,
        Arc::new(Sampler::new()),
        crypto_key,
        settings.key.clone(),
        settings.rate_limit,
        Duration::from_secs(settings.poll_interval_secs),
        Duration::from_secs(settings.report_interval_secs),
    ))
}

fn host_only(address: &str) -> &str {
    address.split(':').next().unwrap_or(address)
}
