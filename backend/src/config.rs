use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub authority: AuthorityConfig,
    pub retry: RetryConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Where a remote mirror finds the execution authority.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorityConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

/// Backoff for transient authority rejections.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl RetryConfig {
    /// Delay before retry number `attempt` (1-based), doubling each time.
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let factor = 1u64 << attempt.saturating_sub(1).min(20);
        self.initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MirrorConfig {
    /// Offline snapshot cache. Disabled when unset.
    pub cache_path: Option<PathBuf>,
}

impl Config {
    /// Defaults, then `willkeeper.toml` (or `$WILLKEEPER_CONFIG`), then
    /// `WILLKEEPER__SECTION__KEY` environment variables.
    pub fn load() -> Result<Self> {
        let path =
            std::env::var("WILLKEEPER_CONFIG").unwrap_or_else(|_| "willkeeper.toml".to_string());

        Self::builder()?
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("WILLKEEPER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .set_default("authority.base_url", "http://127.0.0.1:8080")?
            .set_default("authority.timeout_ms", 10_000)?
            .set_default("retry.max_attempts", 3)?
            .set_default("retry.initial_backoff_ms", 200)?
            .set_default("retry.max_backoff_ms", 5_000)
            .context("Failed to set configuration defaults")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
