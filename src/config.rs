// Runtime configuration
// Resolved from the environment (a `.env` file is loaded first when present).
// Command-line flags in the binaries override these values.

use crate::importer::DEFAULT_ERROR_DISPLAY_LIMIT;
use anyhow::{Context, Result};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "CAMPAIGN_DB_PATH";
pub const ENV_ERROR_DISPLAY_LIMIT: &str = "CAMPAIGN_ERROR_DISPLAY_LIMIT";
pub const ENV_SERVER_ADDR: &str = "CAMPAIGN_SERVER_ADDR";

pub const DEFAULT_DB_PATH: &str = "campaigns.db";
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub error_display_limit: usize,
    pub server_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            error_display_limit: DEFAULT_ERROR_DISPLAY_LIMIT,
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
        }
    }
}

impl Config {
    /// Load `.env` (if any), then read the process environment
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or blank keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path.trim());
        }

        if let Some(limit) = get(ENV_ERROR_DISPLAY_LIMIT) {
            config.error_display_limit = limit
                .trim()
                .parse()
                .with_context(|| format!("{} must be a non-negative integer, got {:?}", ENV_ERROR_DISPLAY_LIMIT, limit))?;
        }

        if let Some(addr) = get(ENV_SERVER_ADDR) {
            config.server_addr = addr.trim().to_string();
        }

        Ok(config)
    }
}
