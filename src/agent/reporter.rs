//! Agent reporter (C5): collector task, report dispatcher, and a bounded
//! worker pool that encrypts and posts metric batches. Grounded on
//! `original_source/internal/agent/agent.go`'s `Agent.Run` — two long-lived
//! goroutines (poll loop, report loop) feeding a pool of `postWorker`
//! goroutines over a `jobs`/`res` channel pair.
//!
//! The original's `jobs` channel is unbuffered (a send blocks until a
//! worker is ready to receive). Tokio's `mpsc` has no zero-capacity
//! variant, so `bounded(1)` is used as the closest equivalent (see
//! SPEC_FULL.md's Open Question resolution).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::agent::client::Poster;
use crate::agent::netutils;
use crate::agent::sampler::Sampler;
use crate::crypto::PublicKey;

struct Job {
    body: Vec<u8>,
}

struct JobResult {
    worker: usize,
    error: Option<String>,
}

pub struct Reporter {
    client: Arc<dyn Poster>,
    sampler: Arc<Sampler>,
    crypto_key: Option<Arc<PublicKey>>,
    hash_key: Option<String>,
    rate_limit: usize,
    poll_interval: Duration,
    report_interval: Duration,
}

impl Reporter {
    pub fn new(
        client: Arc<dyn Poster>,
        sampler: Arc<Sampler>,
        crypto_key: Option<PublicKey>,
        hash_key: Option<String>,
        rate_limit: usize,
        poll_interval: Duration,
        report_interval: Duration,
    ) -> Self {
        Self {
            client,
            sampler,
            crypto_key: crypto_key.map(Arc::new),
            hash_key,
            rate_limit: rate_limit.max(1),
            poll_interval,
            report_interval,
        }
    }

    /// Runs the collector loop, the report-dispatch loop, and the worker
    /// pool until `cancel` fires. Mirrors `Agent.Run`'s two-goroutine +
    /// worker-pool structure with Tokio tasks joined at shutdown.
    pub async fn run(&self, cancel: CancellationToken) {
        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>(1);
        let (res_tx, res_rx) = mpsc::channel::<JobResult>(self.rate_limit.max(1) * 2);
        let jobs_rx = Arc::new(Mutex::new(jobs_rx));

        let mut workers = Vec::with_capacity(self.rate_limit);
        for worker in 0..self.rate_limit {
            let jobs_rx = jobs_rx.clone();
            let res_tx = res_tx.clone();
            let client = self.client.clone();
            let crypto_key = self.crypto_key.clone();
            let hash_key = self.hash_key.clone();
            workers.push(tokio::spawn(async move {
                post_worker(worker, jobs_rx, res_tx, client, crypto_key, hash_key).await
            }));
        }
        drop(res_tx);

        let drainer = tokio::spawn(drain_results(res_rx));

        let poll_loop = self.poll_loop(cancel.clone());
        let report_loop = self.report_loop(cancel.clone(), jobs_tx);

        tokio::join!(poll_loop, report_loop);

        for worker in workers {
            let _ = worker.await;
        }
        let _ = drainer.await;
    }

    async fn poll_loop(&self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("poll loop stopped");
                    return;
                }
                _ = tokio::time::sleep(self.poll_interval) => {
                    self.sampler.poll().await;
                }
            }
        }
    }

    async fn report_loop(&self, cancel: CancellationToken, jobs: mpsc::Sender<Job>) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("report loop stopped");
                    return;
                }
                _ = tokio::time::sleep(self.report_interval) => {
                    let metrics = self.sampler.snapshot().await;
                    if metrics.is_empty() {
                        continue;
                    }

                    let body = match serde_json::to_vec(&metrics) {
                        Ok(body) => body,
                        Err(err) => {
                            tracing::error!(error = %err, "failed to marshal metrics batch");
                            continue;
                        }
                    };

                    if jobs.send(Job { body }).await.is_err() {
                        tracing::warn!("job channel closed, dropping report tick");
                    }
                }
            }
        }
    }
}

async fn post_worker(
    worker: usize,
    jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
    res: mpsc::Sender<JobResult>,
    client: Arc<dyn Poster>,
    crypto_key: Option<Arc<PublicKey>>,
    hash_key: Option<String>,
) {
    loop {
        let job = {
            let mut rx = jobs.lock().await;
            rx.recv().await
        };
        let Some(job) = job else {
            tracing::debug!(worker, "worker finished");
            return;
        };

        let result = post_once(&job.body, crypto_key.as_deref(), hash_key.as_deref(), &*client).await;
        let job_result = JobResult {
            worker,
            error: result.err().map(|e| e.to_string()),
        };
        if res.send(job_result).await.is_err() {
            return;
        }
    }
}

async fn post_once(
    body: &[u8],
    crypto_key: Option<&PublicKey>,
    hash_key: Option<&str>,
    client: &dyn Poster,
) -> anyhow::Result<()> {
    let payload = match crypto_key {
        Some(key) => crate::crypto::encrypt_body(key, body)?,
        None => body.to_vec(),
    };

    let signature = hash_key.map(|key| crate::crypto::sign_hex(key.as_bytes(), &payload));
    let real_ip = netutils::local_real_ip();

    client.post_updates(payload, signature, real_ip).await
}

async fn drain_results(mut res: mpsc::Receiver<JobResult>) {
    while let Some(result) = res.recv().await {
        match result.error {
            Some(err) => tracing::warn!(worker = result.worker, error = %err, "failed sending metrics"),
            None => tracing::debug!(worker = result.worker, "metrics sent"),
        }
    }
}
