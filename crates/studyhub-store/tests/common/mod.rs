// Shared helpers for studyhub-store integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::sync::OnceLock;

use sqlx::postgres::PgPoolOptions;
use studyhub_core::testing::Harness;
use studyhub_core::Repository;
use studyhub_store::{PostgresRepository, SqliteRepository};
use tokio::sync::{Mutex, MutexGuard};

/// Environment variable naming a disposable PostgreSQL database
pub const TEST_DATABASE_URL: &str = "STUDYHUB_TEST_DATABASE_URL";

pub fn sqlite_repo() -> SqliteRepository {
    SqliteRepository::open_in_memory().expect("in-memory SQLite should open")
}

/// Exclusive access to the shared test database, emptied on creation
pub struct PgHarness {
    repo: PostgresRepository,
    _guard: MutexGuard<'static, ()>,
}

impl Harness for PgHarness {
    fn repository(&self) -> &dyn Repository {
        &self.repo
    }
}

fn pg_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// `None` when no test database is configured
pub async fn pg_harness() -> Option<PgHarness> {
    let url = std::env::var(TEST_DATABASE_URL).ok()?;
    let guard = pg_lock().lock().await;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("test database should accept connections");
    let repo = PostgresRepository::from_pool(pool)
        .await
        .expect("migrations should apply");
    sqlx::query(
        "TRUNCATE users, main_topics, classes, lessons, user_progress RESTART IDENTITY CASCADE",
    )
    .execute(repo.pool())
    .await
    .expect("tables should truncate");

    Some(PgHarness {
        repo,
        _guard: guard,
    })
}
