//! Configuration management for the Registration Service
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use enrollment_common::DEFAULT_TICKET_FLOOR;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Where registrations and the ticket counter are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Redis,
    /// Process-local state, lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(StorageBackend::Redis),
            "memory" => Ok(StorageBackend::Memory),
            other => anyhow::bail!("Unknown storage backend: {} (expected redis/memory)", other),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub api_host: String,

    /// API server port
    pub api_port: u16,

    pub storage_backend: StorageBackend,

    /// Redis connection URL
    pub redis_url: String,

    /// Directory for uploaded documents. When unset, uploads go to the
    /// storage backend.
    pub upload_dir: Option<PathBuf>,

    /// Lowest ticket number ever issued
    pub ticket_floor: u64,

    /// Bound on every storage round trip
    pub store_timeout: Duration,

    /// Maximum accepted request body size in bytes
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let config = Config {
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8086".to_string())
                .parse()
                .context("Invalid API_PORT")?,

            storage_backend: env::var("STORAGE_BACKEND")
                .unwrap_or_else(|_| "redis".to_string())
                .parse()
                .context("Invalid STORAGE_BACKEND")?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),

            upload_dir: env::var("UPLOAD_DIR").ok().map(PathBuf::from),

            ticket_floor: env::var("TICKET_FLOOR")
                .unwrap_or_else(|_| DEFAULT_TICKET_FLOOR.to_string())
                .parse()
                .context("Invalid TICKET_FLOOR")?,

            store_timeout: Duration::from_millis(
                env::var("STORE_TIMEOUT_MS")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .context("Invalid STORE_TIMEOUT_MS")?,
            ),

            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| (10 * 1024 * 1024).to_string())
                .parse()
                .context("Invalid MAX_UPLOAD_BYTES")?,
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("API_PORT must be greater than 0");
        }

        if self.ticket_floor == 0 {
            anyhow::bail!("TICKET_FLOOR must be greater than 0");
        }

        if self.store_timeout.is_zero() {
            anyhow::bail!("STORE_TIMEOUT_MS must be greater than 0");
        }

        if self.max_upload_bytes == 0 {
            anyhow::bail!("MAX_UPLOAD_BYTES must be greater than 0");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}
