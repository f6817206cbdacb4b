//! SQL migrations embedded at compile time, one list per dialect

/// Migration metadata
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

pub fn sqlite_migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_initial_schema",
        sql: include_str!("../../migrations/sqlite/001_initial_schema.sql"),
    }]
}

pub fn postgres_migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_initial_schema",
        sql: include_str!("../../migrations/postgres/001_initial_schema.sql"),
    }]
}
