//! Runtime configuration: where the database lives and how chatty the log is.

use std::env;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use tracing_subscriber::EnvFilter;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".pantry-manager";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "pantry.sqlite";
/// Log file written next to the database.
const LOG_FILE_NAME: &str = "pantry.log";
const DB_PATH_VAR: &str = "PANTRY_DB_PATH";
const LOG_FILTER_VAR: &str = "PANTRY_LOG";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub log_filter: String,
}

impl Config {
    /// Resolve paths from the environment, falling back to the home directory.
    pub fn from_env() -> Result<Self> {
        let db_path = match env::var_os(DB_PATH_VAR) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => default_db_path()?,
        };
        let log_filter = env::var(LOG_FILTER_VAR)
            .ok()
            .filter(|filter| !filter.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        Ok(Self::with_db_path(db_path, log_filter))
    }

    pub fn with_db_path(db_path: PathBuf, log_filter: impl Into<String>) -> Self {
        let log_path = db_path
            .parent()
            .map(|dir| dir.join(LOG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(LOG_FILE_NAME));
        Self {
            db_path,
            log_path,
            log_filter: log_filter.into(),
        }
    }
}

/// Resolve the absolute path to the SQLite database inside the user's home.
fn default_db_path() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME))
}

/// Install the global tracing subscriber. Output goes to the log file because
/// the terminal belongs to the UI while it runs.
pub fn init_logging(config: &Config) -> Result<()> {
    if let Some(parent) = config.log_path.parent() {
        fs::create_dir_all(parent).context("failed to create log directory")?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
        .with_context(|| format!("failed to open log file {}", config.log_path.display()))?;

    let filter = EnvFilter::try_new(&config.log_filter)
        .with_context(|| format!("invalid log filter '{}'", config.log_filter))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_sits_next_to_database() {
        let config = Config::with_db_path(PathBuf::from("/tmp/pantry/pantry.sqlite"), "debug");
        assert_eq!(config.log_path, PathBuf::from("/tmp/pantry/pantry.log"));
        assert_eq!(config.log_filter, "debug");
    }
}
