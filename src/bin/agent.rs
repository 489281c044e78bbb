//! Agent entry point: loads settings, builds the reporter, and runs it
//! until a shutdown signal arrives.

use clap::Parser;
use tokio_util::sync::CancellationToken;

use metrics_pipeline::agent;
use metrics_pipeline::config::{AgentArgs, AgentSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = AgentArgs::parse();
    let settings = AgentSettings::load(args)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cancel = CancellationToken::new();
    let reporter = agent::build_reporter(&settings, cancel.clone()).await?;

    let run = reporter.run(cancel.clone());
    tokio::pin!(run);

    tokio::select! {
        _ = &mut run => {}
        _ = wait_for_shutdown_signal() => {
            tracing::info!("shutdown signal received, draining");
            cancel.cancel();
            run.await;
        }
    }

    Ok(())
}

async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
}
