//! Backend selection
//!
//! The backend is chosen once at startup from `STUDYHUB_*` environment
//! variables (a `.env` file is honoured) and handed out as
//! `Arc<dyn Repository>`.
//!
//! | Variable | Default |
//! |---|---|
//! | `STUDYHUB_BACKEND` | `sqlite` (`memory`, `sqlite`, `postgres`) |
//! | `STUDYHUB_SQLITE_PATH` | `.studyhub/store.db` |
//! | `STUDYHUB_DATABASE_URL`, else `DATABASE_URL` | none; required for `postgres` |
//! | `STUDYHUB_MAX_CONNECTIONS` | `5` |

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use studyhub_core::{MemoryRepository, Repository};
use studyhub_core_types::Sensitive;

use crate::errors::{config_error, Result};
use crate::repo::{PostgresRepository, SqliteRepository};

const ENV_PREFIX: &str = "STUDYHUB";
const FALLBACK_DATABASE_URL: &str = "DATABASE_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Memory,
    #[default]
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: Backend,
    pub sqlite_path: PathBuf,
    pub database_url: Option<Sensitive<String>>,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            sqlite_path: PathBuf::from(".studyhub/store.db"),
            database_url: None,
            max_connections: 5,
        }
    }
}

impl StoreConfig {
    pub fn memory() -> Self {
        Self {
            backend: Backend::Memory,
            ..Self::default()
        }
    }

    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: Backend::Sqlite,
            sqlite_path: path.into(),
            ..Self::default()
        }
    }

    pub fn postgres(database_url: impl Into<String>) -> Self {
        Self {
            backend: Backend::Postgres,
            database_url: Some(Sensitive::new(database_url.into())),
            ..Self::default()
        }
    }

    /// Read the process environment, after loading `.env` if present
    ///
    /// # Errors
    ///
    /// Returns a `Config` error for unparseable values.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars().collect())
    }

    /// Build from an explicit variable map
    ///
    /// # Errors
    ///
    /// Returns a `Config` error for unparseable values.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let fallback_url = vars.get(FALLBACK_DATABASE_URL).cloned();
        let mut config: StoreConfig = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(Some(vars)),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| config_error(e.to_string()))?;

        if config.database_url.is_none() {
            config.database_url = fallback_url.map(Sensitive::new);
        }
        Ok(config)
    }
}

/// Open the configured backend
///
/// # Errors
///
/// Returns a `Config` error when `postgres` is selected without a URL, and
/// the backend's own error when it cannot be opened or migrated.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn Repository>> {
    match config.backend {
        Backend::Memory => {
            tracing::info!(backend = "memory", "opening store");
            Ok(Arc::new(MemoryRepository::new()))
        }
        Backend::Sqlite => {
            tracing::info!(backend = "sqlite", path = %config.sqlite_path.display(), "opening store");
            Ok(Arc::new(SqliteRepository::open(&config.sqlite_path)?))
        }
        Backend::Postgres => {
            let url = config.database_url.as_ref().ok_or_else(|| {
                config_error("postgres backend selected but no database URL is set")
            })?;
            tracing::info!(backend = "postgres", "opening store");
            let repo = PostgresRepository::connect(url.expose(), config.max_connections).await?;
            Ok(Arc::new(repo))
        }
    }
}
