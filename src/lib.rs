//! Two-party metrics pipeline: an agent that samples and reports host
//! metrics, and a server that ingests, stores, and periodically snapshots
//! them. See `SPEC_FULL.md` for the full component breakdown.

pub mod agent;
pub mod config;
pub mod crypto;
pub mod model;
pub mod retry;
pub mod server;
pub mod snapshot;
pub mod storage;

/// Generated RPC types and service traits (C8/C13), compiled from
/// `proto/metrics.proto` by `build.rs`.
pub mod pb {
    tonic::include_proto!("metrics");
}
