//! Error handling for studyhub-store
//!
//! Maps driver errors onto the shared `ExError` taxonomy. Constraint
//! failures become `ConstraintViolation` in both drivers so callers can
//! treat every backend alike.

use studyhub_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_entity_id(migration_id)
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::ConstraintViolation)
        .with_op("migration_checksum")
        .with_entity_id(migration_id)
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

pub fn config_error(reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Config)
        .with_op("config")
        .with_message(reason)
}

/// The SQLite connection mutex was poisoned by a panicking holder
pub fn lock_poisoned(op: &'static str) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op(op)
        .with_message("SQLite connection lock poisoned")
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    use rusqlite::ErrorCode;

    let kind = match &err {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::ConstraintViolation => ExErrorKind::ConstraintViolation,
            ErrorCode::CannotOpen | ErrorCode::NotADatabase => ExErrorKind::Connectivity,
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => ExErrorKind::Timeout,
            _ => ExErrorKind::Persistence,
        },
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => ExErrorKind::InvalidInput,
        _ => ExErrorKind::Persistence,
    };
    ExError::new(kind)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create a database error from sqlx::Error
pub fn from_sqlx(err: sqlx::Error) -> ExError {
    let kind = match &err {
        sqlx::Error::Database(db)
            if db.is_unique_violation() || db.is_foreign_key_violation() =>
        {
            ExErrorKind::ConstraintViolation
        }
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
            ExErrorKind::Connectivity
        }
        sqlx::Error::PoolTimedOut => ExErrorKind::Timeout,
        sqlx::Error::Configuration(_) => ExErrorKind::Config,
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => ExErrorKind::InvalidInput,
        _ => ExErrorKind::Persistence,
    };
    ExError::new(kind)
        .with_op("postgres")
        .with_message(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_constraint_maps_to_constraint_violation() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE),
            Some("UNIQUE constraint failed: users.email".to_string()),
        );
        assert_eq!(from_rusqlite(err).kind(), ExErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_sqlite_busy_maps_to_timeout() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert_eq!(from_rusqlite(err).kind(), ExErrorKind::Timeout);
    }

    #[test]
    fn test_sqlx_pool_errors() {
        assert_eq!(
            from_sqlx(sqlx::Error::PoolTimedOut).kind(),
            ExErrorKind::Timeout
        );
        assert_eq!(
            from_sqlx(sqlx::Error::PoolClosed).kind(),
            ExErrorKind::Connectivity
        );
        assert_eq!(
            from_sqlx(sqlx::Error::RowNotFound).kind(),
            ExErrorKind::Persistence
        );
    }

    #[test]
    fn test_checksum_mismatch_names_migration() {
        let err = checksum_mismatch("001_initial_schema", "aaa", "bbb");
        assert!(err.is_constraint_violation());
        assert_eq!(err.entity_id(), Some("001_initial_schema"));
    }
}
