//! SQLite migration runner
//!
//! Applies each embedded migration once, inside its own transaction, and
//! records it in `schema_version` with its checksum. Re-running is a no-op;
//! an applied migration whose SQL has since changed is rejected.

use rusqlite::{Connection, OptionalExtension};

use crate::errors::{checksum_mismatch, from_rusqlite, migration_error, Result};
use crate::migrations::checksums::compute_checksum;
use crate::migrations::embedded::sqlite_migrations;

/// Apply all pending migrations, returning the ids applied by this call
pub fn apply_migrations(conn: &mut Connection) -> Result<Vec<&'static str>> {
    create_schema_version_table(conn)?;

    let mut applied = Vec::new();
    for migration in sqlite_migrations() {
        if apply_migration(conn, migration.id, migration.sql)? {
            tracing::info!(migration_id = migration.id, "applied sqlite migration");
            applied.push(migration.id);
        }
    }
    Ok(applied)
}

/// Migration ids recorded in `schema_version`, in application order
pub fn applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    create_schema_version_table(conn)?;
    let mut stmt = conn
        .prepare("SELECT migration_id FROM schema_version ORDER BY id")
        .map_err(from_rusqlite)?;
    let ids = stmt
        .query_map([], |row| row.get(0))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<String>, _>>()
        .map_err(from_rusqlite)?;
    Ok(ids)
}

fn create_schema_version_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY,
            migration_id TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL,
            checksum TEXT NOT NULL
        )",
        [],
    )
    .map_err(from_rusqlite)?;

    Ok(())
}

/// Returns whether the migration was applied now
fn apply_migration(conn: &mut Connection, migration_id: &str, sql: &str) -> Result<bool> {
    let checksum = compute_checksum(sql);

    let recorded: Option<String> = conn
        .query_row(
            "SELECT checksum FROM schema_version WHERE migration_id = ?1",
            [migration_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?;

    if let Some(recorded) = recorded {
        if recorded != checksum {
            return Err(checksum_mismatch(migration_id, &recorded, &checksum));
        }
        return Ok(false);
    }

    let tx = conn.transaction().map_err(from_rusqlite)?;
    tx.execute_batch(sql)
        .map_err(|e| migration_error(migration_id, &e.to_string()))?;
    tx.execute(
        "INSERT INTO schema_version (migration_id, applied_at, checksum) VALUES (?1, ?2, ?3)",
        rusqlite::params![migration_id, chrono::Utc::now().timestamp_millis(), checksum],
    )
    .map_err(from_rusqlite)?;
    tx.commit().map_err(from_rusqlite)?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_migrations() {
        let mut conn = Connection::open_in_memory().unwrap();
        let applied = apply_migrations(&mut conn).unwrap();
        assert_eq!(applied, vec!["001_initial_schema"]);
    }

    #[test]
    fn test_idempotency() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        assert!(apply_migrations(&mut conn).unwrap().is_empty());
        assert_eq!(
            applied_migrations(&conn).unwrap(),
            vec!["001_initial_schema".to_string()]
        );
    }

    #[test]
    fn test_edited_migration_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        conn.execute(
            "UPDATE schema_version SET checksum = 'stale' WHERE migration_id = '001_initial_schema'",
            [],
        )
        .unwrap();

        let err = apply_migrations(&mut conn).unwrap_err();
        assert!(err.is_constraint_violation());
    }
}
