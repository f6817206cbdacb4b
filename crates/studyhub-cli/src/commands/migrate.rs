//! Schema migration command
//!
//! Usage: studyhub migrate

use serde::Serialize;
use studyhub_store::errors::config_error;
use studyhub_store::{db, migrations, Backend, PostgresRepository, StoreConfig};

use super::{print_json, CommandResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MigrateReport {
    backend: &'static str,
    /// Every migration recorded in the database after this run
    migrations: Vec<String>,
}

pub async fn execute(config: &StoreConfig) -> CommandResult {
    let report = match config.backend {
        Backend::Memory => MigrateReport {
            backend: "memory",
            migrations: Vec::new(),
        },
        Backend::Sqlite => {
            let mut conn = db::open(&config.sqlite_path)?;
            migrations::apply_migrations(&mut conn)?;
            MigrateReport {
                backend: "sqlite",
                migrations: migrations::applied_migrations(&conn)?,
            }
        }
        Backend::Postgres => {
            let url = config.database_url.as_ref().ok_or_else(|| {
                config_error("postgres backend selected but no database URL is set")
            })?;
            let repo = PostgresRepository::connect(url.expose(), config.max_connections).await?;
            MigrateReport {
                backend: "postgres",
                migrations: migrations::postgres::applied_migrations(repo.pool()).await?,
            }
        }
    };
    print_json(&report)
}
