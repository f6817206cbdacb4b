//! PostgreSQL migration runner
//!
//! Same bookkeeping as the SQLite runner. Migration SQL runs through the
//! simple query protocol so one file may hold several statements.

use sqlx::{Executor, PgPool};

use crate::errors::{checksum_mismatch, from_sqlx, migration_error, Result};
use crate::migrations::checksums::compute_checksum;
use crate::migrations::embedded::postgres_migrations;

/// Apply all pending migrations, returning the ids applied by this call
pub async fn apply_migrations(pool: &PgPool) -> Result<Vec<&'static str>> {
    create_schema_version_table(pool).await?;

    let mut applied = Vec::new();
    for migration in postgres_migrations() {
        if apply_migration(pool, migration.id, migration.sql).await? {
            tracing::info!(migration_id = migration.id, "applied postgres migration");
            applied.push(migration.id);
        }
    }
    Ok(applied)
}

/// Migration ids recorded in `schema_version`, in application order
pub async fn applied_migrations(pool: &PgPool) -> Result<Vec<String>> {
    create_schema_version_table(pool).await?;
    sqlx::query_scalar("SELECT migration_id FROM schema_version ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(from_sqlx)
}

async fn create_schema_version_table(pool: &PgPool) -> Result<()> {
    pool.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id BIGSERIAL PRIMARY KEY,
            migration_id TEXT NOT NULL UNIQUE,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            checksum TEXT NOT NULL
        )",
    )
    .await
    .map_err(from_sqlx)?;
    Ok(())
}

async fn apply_migration(pool: &PgPool, migration_id: &str, sql: &str) -> Result<bool> {
    let checksum = compute_checksum(sql);

    let recorded: Option<String> =
        sqlx::query_scalar("SELECT checksum FROM schema_version WHERE migration_id = $1")
            .bind(migration_id)
            .fetch_optional(pool)
            .await
            .map_err(from_sqlx)?;

    if let Some(recorded) = recorded {
        if recorded != checksum {
            return Err(checksum_mismatch(migration_id, &recorded, &checksum));
        }
        return Ok(false);
    }

    let mut tx = pool.begin().await.map_err(from_sqlx)?;
    (&mut *tx)
        .execute(sql)
        .await
        .map_err(|e| migration_error(migration_id, &e.to_string()))?;
    sqlx::query("INSERT INTO schema_version (migration_id, checksum) VALUES ($1, $2)")
        .bind(migration_id)
        .bind(&checksum)
        .execute(&mut *tx)
        .await
        .map_err(from_sqlx)?;
    tx.commit().await.map_err(from_sqlx)?;

    Ok(true)
}
