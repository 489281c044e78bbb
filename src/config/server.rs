use std::path::PathBuf;

use clap::Parser;
use config::{Config, ConfigError};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_store_interval")]
    pub store_interval_secs: u64,
    pub file_storage_path: Option<PathBuf>,
    #[serde(default)]
    pub restore: bool,
    pub database_dsn: Option<String>,
    pub key: Option<String>,
    pub crypto_key: Option<PathBuf>,
    pub trusted_subnet: Option<String>,
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,
}

fn default_address() -> String {
    "localhost:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_store_interval() -> u64 {
    300
}

fn default_grpc_port() -> u16 {
    3200
}

/// Command-line overrides, highest precedence (spec.md §6 env var table
/// names the env vars; flags mirror them 1:1 the way
/// `original_source/internal/server/config/config.go` does).
#[derive(Parser, Debug, Default)]
#[command(name = "server", about = "Metrics pipeline server")]
pub struct ServerArgs {
    /// Host:port to listen on. Overrides ADDRESS.
    #[arg(short = 'a', long)]
    pub address: Option<String>,
    /// Log level. Overrides LOG_LEVEL.
    #[arg(short = 'l', long)]
    pub log_level: Option<String>,
    /// Snapshot interval in seconds. Overrides STORE_INTERVAL.
    #[arg(short = 'i', long = "store-interval")]
    pub store_interval_secs: Option<u64>,
    /// Snapshot file path. Overrides FILE_STORAGE_PATH.
    #[arg(short = 'f', long = "file-storage-path")]
    pub file_storage_path: Option<PathBuf>,
    /// Restore from snapshot at startup. Overrides RESTORE.
    #[arg(short = 'r', long)]
    pub restore: bool,
    /// Postgres DSN. Overrides DATABASE_DSN.
    #[arg(short = 'd', long = "database-dsn")]
    pub database_dsn: Option<String>,
    /// Shared HMAC secret. Overrides KEY.
    #[arg(short = 'k', long)]
    pub key: Option<String>,
    /// RSA private key PEM path. Overrides CRYPTO_KEY.
    #[arg(long = "crypto-key")]
    pub crypto_key: Option<PathBuf>,
    /// Trusted subnet CIDR. Overrides TRUSTED_SUBNET.
    #[arg(short = 't', long = "trusted-subnet")]
    pub trusted_subnet: Option<String>,
    /// gRPC port. Overrides GRPC_PORT.
    #[arg(short = 'g', long = "grpc-port")]
    pub grpc_port: Option<u16>,
    /// Path to a JSON config file. Same as CONFIG.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

impl ServerSettings {
    pub fn load(args: ServerArgs) -> Result<Self, ConfigError> {
        let config_path = args
            .config
            .clone()
            .or_else(|| std::env::var("CONFIG").ok().map(PathBuf::from));

        let mut builder = Config::builder()
            .set_default("address", default_address())?
            .set_default("log_level", default_log_level())?
            .set_default("store_interval_secs", default_store_interval() as i64)?
            .set_default("restore", false)?
            .set_default("grpc_port", default_grpc_port() as i64)?;

        if let Some(path) = &config_path {
            builder = builder.add_source(
                config::File::from(path.as_path())
                    .format(config::FileFormat::Json)
                    .required(false),
            );
        }

        let mut settings: ServerSettings = builder.build()?.try_deserialize()?;

        settings.apply_env();
        settings.apply_args(args);

        // DATABASE_DSN configured disables file-restore, mirroring
        // original_source/internal/server/config/config.go::New.
        if settings.database_dsn.is_some() {
            settings.restore = false;
        }

        Ok(settings)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("ADDRESS") {
            self.address = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            self.log_level = v;
        }
        if let Ok(v) = std::env::var("STORE_INTERVAL") {
            if let Ok(n) = v.parse() {
                self.store_interval_secs = n;
            }
        }
        if let Ok(v) = std::env::var("FILE_STORAGE_PATH") {
            self.file_storage_path = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("RESTORE") {
            self.restore = v == "true";
        }
        if let Ok(v) = std::env::var("DATABASE_DSN") {
            self.database_dsn = Some(v);
        }
        if let Ok(v) = std::env::var("KEY") {
            self.key = Some(v);
        }
        if let Ok(v) = std::env::var("CRYPTO_KEY") {
            self.crypto_key = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("TRUSTED_SUBNET") {
            self.trusted_subnet = Some(v);
        }
        if let Ok(v) = std::env::var("GRPC_PORT") {
            if let Ok(n) = v.parse() {
                self.grpc_port = n;
            }
        }
    }

    fn apply_args(&mut self, args: ServerArgs) {
        if let Some(v) = args.address {
            self.address = v;
        }
        if let Some(v) = args.log_level {
            self.log_level = v;
        }
        if let Some(v) = args.store_interval_secs {
            self.store_interval_secs = v;
        }
        if args.file_storage_path.is_some() {
            self.file_storage_path = args.file_storage_path;
        }
        if args.restore {
            self.restore = true;
        }
        if let Some(v) = args.database_dsn {
            self.database_dsn = Some(v);
        }
        if let Some(v) = args.key {
            self.key = Some(v);
        }
        if args.crypto_key.is_some() {
            self.crypto_key = args.crypto_key;
        }
        if let Some(v) = args.trusted_subnet {
            self.trusted_subnet = Some(v);
        }
        if let Some(v) = args.grpc_port {
            self.grpc_port = v;
        }
    }
}
