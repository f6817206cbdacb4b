//! Lesson search matching
//!
//! The in-memory backend calls [`matches`] directly. SQLite registers
//! [`contains`] as a SQL function so both fold case the same way;
//! PostgreSQL translates the query with [`like_pattern`] for `ILIKE`.

use crate::model::Lesson;

/// Escape character used in every generated `LIKE` / `ILIKE` pattern
pub const LIKE_ESCAPE: char = '\\';

/// Trimmed query, or `None` when the query matches everything
pub fn normalize(query: &str) -> Option<&str> {
    let trimmed = query.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Lowercased search needle, or `None` when the query matches everything
pub fn needle(query: &str) -> Option<String> {
    normalize(query).map(str::to_lowercase)
}

/// Unicode case-insensitive substring test; `needle` is already lowercased
pub fn contains(field: &str, needle: &str) -> bool {
    field.to_lowercase().contains(needle)
}

/// True when `lesson` contains `needle` in any searchable field
///
/// `needle` must already be lowercased.
pub fn matches(lesson: &Lesson, needle: &str) -> bool {
    let hit = |field: &str| contains(field, needle);

    hit(&lesson.title)
        || hit(&lesson.content)
        || lesson.excerpt.as_deref().is_some_and(hit)
        || lesson.bible_reference.as_deref().is_some_and(hit)
}

/// `%needle%` with `\`, `%` and `_` escaped
pub fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for ch in query.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
