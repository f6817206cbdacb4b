//! Row mapping for both relational backends
//!
//! Column lists are shared by the SQLite and PostgreSQL queries; each
//! mapper reads its columns starting at `at`, so one joined row can hold a
//! lesson followed by a progress record.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row as _;
use studyhub_core::model::{timestamps, Class, Lesson, MainTopic, User, UserProgress};

pub const USER_COLUMNS: &str = "id, email, full_name, is_admin, created_at";

pub const MAIN_COLUMNS: &str = "id, title, description, icon, sort_order, created_by, created_at";

pub const CLASS_COLUMNS: &str =
    "id, title, description, main_id, parent_class_id, sort_order, created_by, created_at";

pub const LESSON_COLUMNS: &str = "id, title, content, excerpt, bible_reference, image_url, \
     audio_url, duration, class_id, sort_order, is_published, created_by, created_at, updated_at";

pub const PROGRESS_COLUMNS: &str = "id, user_id, lesson_id, completed, bookmarked, study_time, \
     notes, completed_at, created_at, updated_at";

/// Number of columns in [`LESSON_COLUMNS`]
pub const LESSON_WIDTH: usize = 14;

/// Prefix every column of `columns` with `alias.`
pub fn qualified(alias: &str, columns: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

// ===== SQLite =====

fn millis(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: i64 = row.get(idx)?;
    timestamps::from_millis(value).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, value))
}

fn optional_millis(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<i64>>(idx)? {
        Some(value) => timestamps::from_millis(value)
            .map(Some)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, value)),
        None => Ok(None),
    }
}

pub fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        is_admin: row.get(3)?,
        created_at: millis(row, 4)?,
    })
}

pub fn main_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MainTopic> {
    Ok(MainTopic {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        order: row.get(4)?,
        created_by: row.get(5)?,
        created_at: millis(row, 6)?,
    })
}

pub fn class_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Class> {
    Ok(Class {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        main_id: row.get(3)?,
        parent_class_id: row.get(4)?,
        order: row.get(5)?,
        created_by: row.get(6)?,
        created_at: millis(row, 7)?,
    })
}

pub fn lesson_from_row(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<Lesson> {
    Ok(Lesson {
        id: row.get(at)?,
        title: row.get(at + 1)?,
        content: row.get(at + 2)?,
        excerpt: row.get(at + 3)?,
        bible_reference: row.get(at + 4)?,
        image_url: row.get(at + 5)?,
        audio_url: row.get(at + 6)?,
        duration: row.get(at + 7)?,
        class_id: row.get(at + 8)?,
        order: row.get(at + 9)?,
        is_published: row.get(at + 10)?,
        created_by: row.get(at + 11)?,
        created_at: millis(row, at + 12)?,
        updated_at: millis(row, at + 13)?,
    })
}

pub fn progress_from_row(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<UserProgress> {
    Ok(UserProgress {
        id: row.get(at)?,
        user_id: row.get(at + 1)?,
        lesson_id: row.get(at + 2)?,
        completed: row.get(at + 3)?,
        bookmarked: row.get(at + 4)?,
        study_time: row.get(at + 5)?,
        notes: row.get(at + 6)?,
        completed_at: optional_millis(row, at + 7)?,
        created_at: millis(row, at + 8)?,
        updated_at: millis(row, at + 9)?,
    })
}

// ===== PostgreSQL =====

pub fn user_from_pg(row: &PgRow) -> sqlx::Result<User> {
    Ok(User {
        id: row.try_get(0)?,
        email: row.try_get(1)?,
        full_name: row.try_get(2)?,
        is_admin: row.try_get(3)?,
        created_at: row.try_get(4)?,
    })
}

pub fn main_from_pg(row: &PgRow) -> sqlx::Result<MainTopic> {
    Ok(MainTopic {
        id: row.try_get(0)?,
        title: row.try_get(1)?,
        description: row.try_get(2)?,
        icon: row.try_get(3)?,
        order: row.try_get(4)?,
        created_by: row.try_get(5)?,
        created_at: row.try_get(6)?,
    })
}

pub fn class_from_pg(row: &PgRow) -> sqlx::Result<Class> {
    Ok(Class {
        id: row.try_get(0)?,
        title: row.try_get(1)?,
        description: row.try_get(2)?,
        main_id: row.try_get(3)?,
        parent_class_id: row.try_get(4)?,
        order: row.try_get(5)?,
        created_by: row.try_get(6)?,
        created_at: row.try_get(7)?,
    })
}

pub fn lesson_from_pg(row: &PgRow, at: usize) -> sqlx::Result<Lesson> {
    Ok(Lesson {
        id: row.try_get(at)?,
        title: row.try_get(at + 1)?,
        content: row.try_get(at + 2)?,
        excerpt: row.try_get(at + 3)?,
        bible_reference: row.try_get(at + 4)?,
        image_url: row.try_get(at + 5)?,
        audio_url: row.try_get(at + 6)?,
        duration: row.try_get(at + 7)?,
        class_id: row.try_get(at + 8)?,
        order: row.try_get(at + 9)?,
        is_published: row.try_get(at + 10)?,
        created_by: row.try_get(at + 11)?,
        created_at: row.try_get(at + 12)?,
        updated_at: row.try_get(at + 13)?,
    })
}

pub fn progress_from_pg(row: &PgRow, at: usize) -> sqlx::Result<UserProgress> {
    Ok(UserProgress {
        id: row.try_get(at)?,
        user_id: row.try_get(at + 1)?,
        lesson_id: row.try_get(at + 2)?,
        completed: row.try_get(at + 3)?,
        bookmarked: row.try_get(at + 4)?,
        study_time: row.try_get(at + 5)?,
        notes: row.try_get(at + 6)?,
        completed_at: row.try_get(at + 7)?,
        created_at: row.try_get(at + 8)?,
        updated_at: row.try_get(at + 9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_prefixes_every_column() {
        assert_eq!(
            qualified("p", "id, user_id, lesson_id"),
            "p.id, p.user_id, p.lesson_id"
        );
    }

    #[test]
    fn test_lesson_width_matches_column_list() {
        assert_eq!(LESSON_COLUMNS.split(',').count(), LESSON_WIDTH);
        assert_eq!(PROGRESS_COLUMNS.split(',').count(), 10);
    }

    #[test]
    fn test_sqlite_timestamp_decodes_millis() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let t = conn
            .query_row("SELECT 1700000000123, NULL", [], |row| {
                Ok((millis(row, 0)?, optional_millis(row, 1)?))
            })
            .unwrap();
        assert_eq!(t.0.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(t.1, None);
    }
}
