mod file_config;

pub use file_config::{AuthConfig, FileConfig, StorageConfig};

use crate::server::{RequestsLoggingLevel, ServerConfig};
use crate::user::auth::{random_string, DEFAULT_TOKEN_TTL_HOURS};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_READ_POOL_SIZE: usize = 4;
const GENERATED_SECRET_LENGTH: usize = 64;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub jwt_secret: Option<String>,
    pub token_ttl_hours: Option<u64>,
    pub busy_timeout_ms: Option<u64>,
    pub read_pool_size: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub jwt_secret: String,
    /// False when the secret was generated at startup.
    pub jwt_secret_configured: bool,
    pub token_ttl_hours: u64,
    pub busy_timeout: Duration,
    pub read_pool_size: usize,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if port == metrics_port {
            bail!("port and metrics_port must differ, both are {}", port);
        }

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let auth = file.auth.unwrap_or_default();
        let configured_secret = auth
            .jwt_secret
            .or_else(|| cli.jwt_secret.clone())
            .filter(|s| !s.is_empty());
        let jwt_secret_configured = configured_secret.is_some();
        let jwt_secret = configured_secret.unwrap_or_else(|| {
            warn!("No JWT secret configured, generated a random one. Tokens will not survive a restart.");
            random_string(GENERATED_SECRET_LENGTH)
        });

        let token_ttl_hours = auth
            .token_ttl_hours
            .or(cli.token_ttl_hours)
            .unwrap_or(DEFAULT_TOKEN_TTL_HOURS);
        if token_ttl_hours == 0 {
            bail!("token_ttl_hours must be greater than zero");
        }

        let storage = file.storage.unwrap_or_default();
        let busy_timeout_ms = storage
            .busy_timeout_ms
            .or(cli.busy_timeout_ms)
            .unwrap_or(DEFAULT_BUSY_TIMEOUT_MS);
        let read_pool_size = storage
            .read_pool_size
            .or(cli.read_pool_size)
            .unwrap_or(DEFAULT_READ_POOL_SIZE)
            .max(1);

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            jwt_secret,
            jwt_secret_configured,
            token_ttl_hours,
            busy_timeout: Duration::from_millis(busy_timeout_ms),
            read_pool_size,
        })
    }

    pub fn catalog_db_path(&self) -> PathBuf {
        self.db_dir.join("catalog.db")
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            jwt_secret: self.jwt_secret.clone(),
            token_ttl_hours: self.token_ttl_hours,
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
