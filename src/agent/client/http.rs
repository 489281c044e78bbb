//! HTTP poster (C5), grounded on
//! `original_source/internal/agent/http/client.go`: POST the batch to
//! `<baseURL>/updates` with `Content-Type: application/json`,
//! `Accept-Encoding: gzip`, an optional `HashSHA256` signature header, and
//! an optional `X-Real-IP` header; any non-2xx response is an error.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::Poster;
use crate::retry;

pub struct HttpPoster {
    client: reqwest::Client,
    base_url: String,
    cancel: CancellationToken,
}

impl HttpPoster {
    pub fn new(base_url: String, cancel: CancellationToken) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            cancel,
        }
    }

    async fn send_once(
        &self,
        body: &[u8],
        signature: &Option<String>,
        real_ip: &Option<String>,
    ) -> Result<(), reqwest::Error> {
        let mut request = self
            .client
            .post(format!("{}/updates", self.base_url))
            .header("Content-Type", "application/json")
            .header("Accept-Encoding", "gzip")
            .body(body.to_vec());

        if let Some(sig) = signature {
            request = request.header("HashSHA256", sig.clone());
        }
        if let Some(ip) = real_ip {
            request = request.header("X-Real-IP", ip.clone());
        }

        let response = request.send().await?;
        response.error_for_status().map(|_| ())
    }
}

fn is_connection_refused(err: &reqwest::Error) -> bool {
    err.is_connect()
}

#[async_trait]
impl Poster for HttpPoster {
    async fn post_updates(
        &self,
        body: Vec<u8>,
        signature: Option<String>,
        real_ip: Option<String>,
    ) -> anyhow::Result<()> {
        retry::retry_default(is_connection_refused, &self.cancel, || {
            self.send_once(&body, &signature, &real_ip)
        })
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))
    }
}
