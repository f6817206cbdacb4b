//! Relational implementations of the `Repository` contract

pub mod hydration;
pub mod postgres_repo;
pub mod sqlite_repo;

pub use postgres_repo::PostgresRepository;
pub use sqlite_repo::SqliteRepository;
