//! Supervisor (C9): boots storage, restores a snapshot, serves HTTP and RPC
//! concurrently, periodically dumps a snapshot, and shuts both down
//! gracefully on signal. Grounded on the teacher's `main.rs` bootstrap
//! sequence and `original_source/cmd/server/main.go`'s component wiring.

use std::sync::Arc;

use clap::Parser;
use ipnet::IpNet;
use tokio_util::sync::CancellationToken;

use metrics_pipeline::config::{ServerArgs, ServerSettings};
use metrics_pipeline::server::rpc::RpcHandlers;
use metrics_pipeline::server::{self, ServerState};
use metrics_pipeline::storage::{MemoryStorage, PostgresStorage, Storage};
use metrics_pipeline::{crypto, snapshot};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    let settings = ServerSettings::load(args)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .init();

    let storage: Arc<dyn Storage> = if let Some(dsn) = &settings.database_dsn {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(dsn)
            .await?;
        let pg = PostgresStorage::new(pool);
        pg.bootstrap().await?;
        Arc::new(pg)
    } else {
        Arc::new(MemoryStorage::new())
    };

    if settings.restore {
        if let Some(path) = &settings.file_storage_path {
            if let Err(err) = snapshot::restore(&*storage, path).await {
                tracing::warn!(error = %err, "failed to restore snapshot, starting empty");
            } else {
                tracing::info!(path = %path.display(), "restored snapshot");
            }
        }
    }

    let private_key = match &settings.crypto_key {
        Some(path) => Some(crypto::load_private_key(path).await?),
        None => None,
    };

    let trusted_subnet = match &settings.trusted_subnet {
        Some(cidr) => Some(cidr.parse::<IpNet>().map_err(|e| {
            anyhow::anyhow!("invalid TRUSTED_SUBNET {cidr:?}: {e}")
        })?),
        None => None,
    };

    let state = Arc::new(ServerState::new(
        storage.clone(),
        settings.key.clone().map(|k| k.into_bytes()),
        private_key,
        trusted_subnet,
    ));

    let cancel = CancellationToken::new();

    let http_task = spawn_http(state.clone(), settings.address.clone(), cancel.clone());
    let rpc_task = spawn_rpc(state.clone(), settings.grpc_port, cancel.clone());
    let snapshot_task = spawn_snapshot_timer(
        storage.clone(),
        settings.file_storage_path.clone(),
        settings.store_interval_secs,
        cancel.clone(),
    );

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, draining");
    cancel.cancel();

    let _ = tokio::join!(http_task, rpc_task, snapshot_task);

    if let Some(path) = &settings.file_storage_path {
        if let Err(err) = snapshot::dump(&*storage, path).await {
            tracing::error!(error = %err, "failed to write final snapshot");
        }
    }

    Ok(())
}

fn spawn_http(
    state: Arc<ServerState>,
    address: String,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let router = server::http::create_router(state);
        let listener = match tokio::net::TcpListener::bind(&address).await {
            Ok(listener) => listener,
            Err(err) => {
                tracing::error!(error = %err, address = %address, "failed to bind HTTP listener");
                return;
            }
        };
        tracing::info!(address = %address, "HTTP server listening");
        let shutdown = cancel.clone();
        if let Err(err) = axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
        {
            tracing::error!(error = %err, "HTTP server exited with error");
        }
    })
}

fn spawn_rpc(
    state: Arc<ServerState>,
    grpc_port: u16,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let addr = match format!("0.0.0.0:{grpc_port}").parse() {
            Ok(addr) => addr,
            Err(err) => {
                tracing::error!(error = %err, "invalid gRPC bind address");
                return;
            }
        };
        tracing::info!(%addr, "RPC server listening");
        let handlers = RpcHandlers::new(state);
        let shutdown = cancel.clone();
        if let Err(err) = tonic::transport::Server::builder()
            .add_service(metrics_pipeline::pb::handlers_server::HandlersServer::new(
                handlers,
            ))
            .serve_with_shutdown(addr, async move { shutdown.cancelled().await })
            .await
        {
            tracing::error!(error = %err, "RPC server exited with error");
        }
    })
}

fn spawn_snapshot_timer(
    storage: Arc<dyn Storage>,
    path: Option<std::path::PathBuf>,
    interval_secs: u64,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let Some(path) = path else {
            return;
        };
        if interval_secs == 0 {
            return;
        }
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {
                    if let Err(err) = snapshot::dump(&*storage, &path).await {
                        tracing::error!(error = %err, "periodic snapshot dump failed");
                    }
                }
            }
        }
    })
}

async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigquit = signal(SignalKind::quit()).expect("failed to install SIGQUIT handler");

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
        _ = sigquit.recv() => {}
    }
}
