// ⚙️ Configuration - read from the environment, with defaults

use anyhow::{Context, Result};
use std::path::PathBuf;

pub const DEFAULT_DATABASE_PATH: &str = "cnab_store.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// CNAB_DATABASE_PATH
    pub database_path: PathBuf,
    /// CNAB_BIND_ADDR
    pub bind_addr: String,
    /// CNAB_MAX_UPLOAD_BYTES
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(path) = lookup("CNAB_DATABASE_PATH").filter(|v| !v.trim().is_empty()) {
            config.database_path = PathBuf::from(path);
        }

        if let Some(addr) = lookup("CNAB_BIND_ADDR").filter(|v| !v.trim().is_empty()) {
            config.bind_addr = addr;
        }

        if let Some(raw) = lookup("CNAB_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = raw
                .trim()
                .parse()
                .with_context(|| format!("CNAB_MAX_UPLOAD_BYTES must be a byte count, got '{}'", raw))?;
        }

        Ok(config)
    }
}
