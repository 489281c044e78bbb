//! RPC poster (C5), grounded on
//! `original_source/internal/agent/gRPC/client.go`. Per REDESIGN FLAG #6,
//! retry is gated only on the transport reporting `Unavailable` — any other
//! status (validation, permission, internal) returns immediately.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tonic::transport::Channel;
use tonic::{Request, Status};

use super::Poster;
use crate::pb::handlers_client::HandlersClient;
use crate::pb::PostUpdatesRequest;
use crate::retry;

pub struct RpcPoster {
    client: Mutex<HandlersClient<Channel>>,
    cancel: CancellationToken,
}

impl RpcPoster {
    pub async fn connect(endpoint: String, cancel: CancellationToken) -> anyhow::Result<Self> {
        let client = HandlersClient::connect(endpoint).await?;
        Ok(Self {
            client: Mutex::new(client),
            cancel,
        })
    }

    async fn send_once(
        &self,
        body: &[u8],
        signature: &Option<String>,
        real_ip: &Option<String>,
    ) -> Result<(), Status> {
        let mut request = Request::new(PostUpdatesRequest {
            metrics: body.to_vec(),
        });

        if let Some(sig) = signature {
            request
                .metadata_mut()
                .insert("hashsha256", sig.parse().map_err(|_| Status::invalid_argument("bad signature header"))?);
        }
        if let Some(ip) = real_ip {
            request
                .metadata_mut()
                .insert("x-real-ip", ip.parse().map_err(|_| Status::invalid_argument("bad real-ip header"))?);
        }

        let mut client = self.client.lock().await;
        client.post_updates(request).await.map(|_| ())
    }
}

fn is_unavailable(status: &Status) -> bool {
    status.code() == tonic::Code::Unavailable
}

#[async_trait]
impl Poster for RpcPoster {
    async fn post_updates(
        &self,
        body: Vec<u8>,
        signature: Option<String>,
        real_ip: Option<String>,
    ) -> anyhow::Result<()> {
        retry::retry_default(is_unavailable, &self.cancel, || {
            self.send_once(&body, &signature, &real_ip)
        })
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))
    }
}
