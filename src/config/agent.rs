use std::path::PathBuf;

use clap::Parser;
use config::{Config, ConfigError};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    pub key: Option<String>,
    #[serde(default = "default_rate_limit")]
    pub rate_limit: usize,
    pub crypto_key: Option<PathBuf>,
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,
    /// When true, post batches over RPC instead of HTTP.
    #[serde(default)]
    pub use_grpc: bool,
}

fn default_address() -> String {
    "localhost:8080".to_string()
}

fn default_report_interval() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    2
}

fn default_rate_limit() -> usize {
    5
}

fn default_grpc_port() -> u16 {
    3200
}

/// Command-line overrides, grounded on
/// `original_source/internal/client/config/config.go`'s flag set.
#[derive(Parser, Debug, Default)]
#[command(name = "agent", about = "Metrics pipeline agent")]
pub struct AgentArgs {
    /// Server host:port. Overrides ADDRESS.
    #[arg(short = 'a', long)]
    pub address: Option<String>,
    /// Report interval in seconds. Overrides REPORT_INTERVAL.
    #[arg(short = 'r', long = "report-interval")]
    pub report_interval_secs: Option<u64>,
    /// Poll interval in seconds. Overrides POLL_INTERVAL.
    #[arg(short = 'p', long = "poll-interval")]
    pub poll_interval_secs: Option<u64>,
    /// Shared HMAC secret. Overrides KEY.
    #[arg(short = 'k', long)]
    pub key: Option<String>,
    /// Worker pool size. Overrides RATE_LIMIT.
    #[arg(short = 'l', long = "rate-limit")]
    pub rate_limit: Option<usize>,
    /// RSA public certificate PEM path. Overrides CRYPTO_KEY.
    #[arg(long = "crypto-key")]
    pub crypto_key: Option<PathBuf>,
    /// gRPC port. Overrides GRPC_PORT.
    #[arg(short = 'g', long = "grpc-port")]
    pub grpc_port: Option<u16>,
    /// Use the RPC transport instead of HTTP.
    #[arg(long = "grpc")]
    pub use_grpc: bool,
    /// Path to a JSON config file. Same as CONFIG.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

impl AgentSettings {
    pub fn load(args: AgentArgs) -> Result<Self, ConfigError> {
        let config_path = args
            .config
            .clone()
            .or_else(|| std::env::var("CONFIG").ok().map(PathBuf::from));

        let mut builder = Config::builder()
            .set_default("address", default_address())?
            .set_default("report_interval_secs", default_report_interval() as i64)?
            .set_default("poll_interval_secs", default_poll_interval() as i64)?
            .set_default("rate_limit", default_rate_limit() as i64)?
            .set_default("grpc_port", default_grpc_port() as i64)?
            .set_default("use_grpc", false)?;

        if let Some(path) = &config_path {
            builder = builder.add_source(
                config::File::from(path.as_path())
                    .format(config::FileFormat::Json)
                    .required(false),
            );
        }

        let mut settings: AgentSettings = builder.build()?.try_deserialize()?;

        settings.apply_env();
        settings.apply_args(args);

        Ok(settings)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("ADDRESS") {
            self.address = v;
        }
        if let Ok(v) = std::env::var("REPORT_INTERVAL") {
            if let Ok(n) = v.parse() {
                self.report_interval_secs = n;
            }
        }
        if let Ok(v) = std::env::var("POLL_INTERVAL") {
            if let Ok(n) = v.parse() {
                self.poll_interval_secs = n;
            }
        }
        if let Ok(v) = std::env::var("KEY") {
            self.key = Some(v);
        }
        if let Ok(v) = std::env::var("RATE_LIMIT") {
            if let Ok(n) = v.parse() {
                self.rate_limit = n;
            }
        }
        if let Ok(v) = std::env::var("CRYPTO_KEY") {
            self.crypto_key = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("GRPC_PORT") {
            if let Ok(n) = v.parse() {
                self.grpc_port = n;
            }
        }
    }

    fn apply_args(&mut self, args: AgentArgs) {
        if let Some(v) = args.address {
            self.address = v;
        }
        if let Some(v) = args.report_interval_secs {
            self.report_interval_secs = v;
        }
        if let Some(v) = args.poll_interval_secs {
            self.poll_interval_secs = v;
        }
        if let Some(v) = args.key {
            self.key = Some(v);
        }
        if let Some(v) = args.rate_limit {
            self.rate_limit = v;
        }
        if args.crypto_key.is_some() {
            self.crypto_key = args.crypto_key;
        }
        if let Some(v) = args.grpc_port {
            self.grpc_port = v;
        }
        if args.use_grpc {
            self.use_grpc = true;
        }
    }
}
