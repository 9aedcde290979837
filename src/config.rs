use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

const APP_DIR: &str = "draft_oracle";
const MODEL_FILE: &str = "draft_forest.json";
const DB_FILE: &str = "predictions.sqlite";
const DEFAULT_LOG_FILTER: &str = "info";

pub const MODEL_PATH_ENV: &str = "DRAFT_ORACLE_MODEL_PATH";
pub const DB_PATH_ENV: &str = "DRAFT_ORACLE_DB_PATH";
pub const LOG_ENV: &str = "DRAFT_ORACLE_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub model_path: PathBuf,
    pub db_path: PathBuf,
    pub log_filter: String,
}

impl AppConfig {
    /// Reads `.env.local` / `.env` first, then the process environment.
    pub fn from_env() -> Result<Self> {
        load_dotenv();
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolves paths from a variable lookup, falling back to the app cache dir.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let model_path = match non_empty(MODEL_PATH_ENV) {
            Some(path) => PathBuf::from(path.trim()),
            None => app_cache_dir()
                .map(|dir| dir.join(MODEL_FILE))
                .with_context(|| format!("set {MODEL_PATH_ENV} or HOME to locate the model"))?,
        };
        let db_path = match non_empty(DB_PATH_ENV) {
            Some(path) => PathBuf::from(path.trim()),
            None => app_cache_dir()
                .map(|dir| dir.join(DB_FILE))
                .with_context(|| format!("set {DB_PATH_ENV} or HOME to locate the store"))?,
        };
        let log_filter = non_empty(LOG_ENV).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            model_path,
            db_path,
            log_filter,
        })
    }

    pub fn with_overrides(mut self, model: Option<&Path>, db: Option<&Path>) -> Self {
        if let Some(path) = model {
            self.model_path = path.to_path_buf();
        }
        if let Some(path) = db {
            self.db_path = path.to_path_buf();
        }
        self
    }
}

pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

pub fn app_cache_dir() -> Option<PathBuf> {
    // Prefer XDG cache.
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(APP_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}

/// Structured logs on stderr so stdout stays clean for JSON output.
pub fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
