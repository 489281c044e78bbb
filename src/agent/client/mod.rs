//! Posting transports (spec.md §4.4): a single `Poster` seam implemented by
//! an HTTP client and an RPC client, picked once at agent construction.

mod http;
mod rpc;

pub use http::HttpPoster;
pub use rpc::RpcPoster;

use async_trait::async_trait;

#[async_trait]
pub trait Poster: Send + Sync {
    /// Sends one already-encrypted metrics batch. `signature`, when
    /// present, is the hex HMAC of the (encrypted) body. `real_ip`, when
    /// present, is this host's outward-facing address for the server's
    /// trusted-subnet check.
    async fn post_updates(
        &self,
        body: Vec<u8>,
        signature: Option<String>,
        real_ip: Option<String>,
    ) -> anyhow::Result<()>;
}
