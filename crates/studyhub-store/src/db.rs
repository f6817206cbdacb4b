//! SQLite connection management

use std::path::Path;
use std::time::Duration;

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use studyhub_core::search;

use crate::errors::{from_rusqlite, Result};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQL name of [`search::contains`]: `contains_folded(haystack, needle)`
pub const CONTAINS_FOLDED: &str = "contains_folded";

/// Open (creating if needed) a SQLite database file
///
/// Missing parent directories are created first.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            studyhub_core::ExError::new(studyhub_core::ExErrorKind::Connectivity)
                .with_op("sqlite_open")
                .with_entity_id(parent.display().to_string())
                .with_message(e.to_string())
        })?;
    }
    let conn = Connection::open(path).map_err(from_rusqlite)?;
    configure(&conn)?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(from_rusqlite)?;
    Ok(conn)
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().map_err(from_rusqlite)?;
    configure(&conn)?;
    Ok(conn)
}

/// Per-connection settings every repository relies on
pub fn configure(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(from_rusqlite)?;
    conn.busy_timeout(BUSY_TIMEOUT).map_err(from_rusqlite)?;
    register_functions(conn)
}

/// Built-in `LIKE` folds ASCII only; search goes through this instead
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        CONTAINS_FOLDED,
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let haystack: Option<String> = ctx.get(0)?;
            let needle: Option<String> = ctx.get(1)?;
            Ok(match (haystack, needle) {
                (Some(haystack), Some(needle)) => search::contains(&haystack, &needle),
                _ => false,
            })
        },
    )
    .map_err(from_rusqlite)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = open_in_memory().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_contains_folded_handles_non_ascii_and_null() {
        let conn = open_in_memory().unwrap();
        let check = |sql: &str| -> bool { conn.query_row(sql, [], |row| row.get(0)).unwrap() };

        assert!(check("SELECT contains_folded('Éxodo y la fe', 'éxodo')"));
        assert!(check("SELECT contains_folded('100% sure', '0%')"));
        assert!(!check("SELECT contains_folded('1000 sure', '0%')"));
        assert!(!check("SELECT contains_folded(NULL, 'faith')"));
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.db");
        open(&path).unwrap();
        assert!(path.exists());
    }
}
