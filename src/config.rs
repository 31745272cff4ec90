//! Configuration for the SQL guard MCP server

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuardConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file. Always opened read-only.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Number of read-only connections opened at startup. Fixed for the
    /// lifetime of the process.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

/// Per-call resource limits
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum engine round trip (preflight and execution) in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Result-row cap; `None` means unlimited
    #[serde(default = "default_max_rows")]
    pub max_rows: Option<usize>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("northwind.db")
}

fn default_pool_size() -> usize {
    4
}

fn default_timeout() -> u64 {
    30
}

fn default_max_rows() -> Option<usize> {
    Some(10_000)
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            pool_size: default_pool_size(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_rows: default_max_rows(),
        }
    }
}

impl GuardConfig {
    /// Load configuration from file
    ///
    /// Looks for config in:
    /// 1. `SQLGUARD_CONFIG_PATH` environment variable
    /// 2. `<config-dir>/sqlguard/config.toml`
    /// 3. `./sqlguard.toml`
    pub fn load() -> Result<Self> {
        let config_path = Self::find_config()?;

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", config_path))
    }

    fn find_config() -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("SQLGUARD_CONFIG_PATH") {
            return Ok(PathBuf::from(env_path));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("sqlguard").join("config.toml");
            if path.exists() {
                return Ok(path);
            }
        }

        let local = PathBuf::from("sqlguard.toml");
        if local.exists() {
            return Ok(local);
        }

        bail!("no config file found")
    }

    /// Create a default config pointing to a specific database
    pub fn with_database(path: PathBuf) -> Self {
        Self {
            database: DatabaseConfig {
                path,
                pool_size: default_pool_size(),
            },
            limits: LimitsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::default();
        assert_eq!(config.database.pool_size, 4);
        assert_eq!(config.limits.timeout_secs, 30);
        assert_eq!(config.limits.max_rows, Some(10_000));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: GuardConfig = toml::from_str(
            r#"
            [database]
            path = "/data/shop.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.path, PathBuf::from("/data/shop.db"));
        assert_eq!(config.database.pool_size, 4);
        assert_eq!(config.limits.timeout_secs, 30);
    }

    #[test]
    fn test_full_toml() {
        let config: GuardConfig = toml::from_str(
            r#"
            [database]
            path = "x.db"
            pool_size = 8

            [limits]
            timeout_secs = 5
            max_rows = 100
            "#,
        )
        .unwrap();
        assert_eq!(config.database.pool_size, 8);
        assert_eq!(config.limits.timeout_secs, 5);
        assert_eq!(config.limits.max_rows, Some(100));
    }

    #[test]
    fn test_with_database() {
        let config = GuardConfig::with_database(PathBuf::from("test.db"));
        assert_eq!(config.database.path, PathBuf::from("test.db"));
        assert_eq!(config.limits.max_rows, Some(10_000));
    }
}
