//! Subcommand implementations and the options they share

pub mod lessons;
pub mod migrate;
pub mod progress;
pub mod search;
pub mod seed;
pub mod tree;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use serde::Serialize;
use studyhub_core::studyhub_core_types::Sensitive;
use studyhub_core::{ExError, LoggedRepository, Repository};
use studyhub_store::{connect, Backend, StoreConfig};

pub type CommandResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BackendArg {
    Memory,
    Sqlite,
    Postgres,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Memory => Backend::Memory,
            BackendArg::Sqlite => Backend::Sqlite,
            BackendArg::Postgres => Backend::Postgres,
        }
    }
}

/// Storage options; each flag overrides its `STUDYHUB_*` variable
#[derive(Debug, Args)]
pub struct StoreArgs {
    /// Storage backend
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendArg>,

    /// SQLite database file
    #[arg(long, global = true)]
    pub sqlite_path: Option<PathBuf>,

    /// PostgreSQL connection URL
    #[arg(long, global = true)]
    pub database_url: Option<String>,
}

impl StoreArgs {
    pub fn resolve(&self) -> Result<StoreConfig, ExError> {
        let mut config = StoreConfig::from_env()?;
        if let Some(backend) = self.backend {
            config.backend = backend.into();
        }
        if let Some(path) = &self.sqlite_path {
            config.sqlite_path = path.clone();
        }
        if let Some(url) = &self.database_url {
            config.database_url = Some(Sensitive::new(url.clone()));
        }
        Ok(config)
    }
}

/// Open the configured backend behind the logging decorator
pub async fn open(
    config: &StoreConfig,
) -> Result<LoggedRepository<Arc<dyn Repository>>, ExError> {
    Ok(LoggedRepository::new(connect(config).await?))
}

pub fn print_json<T: Serialize>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
