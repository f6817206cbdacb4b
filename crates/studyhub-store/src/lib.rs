//! StudyHub Store - relational backends
//!
//! Provides:
//! - [`SqliteRepository`]: embedded SQLite through `rusqlite`
//! - [`PostgresRepository`]: pooled PostgreSQL through `sqlx`
//! - embedded, checksummed schema migrations for both
//! - [`StoreConfig`] and [`connect`], which pick the backend at startup

pub mod config;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

pub use config::{connect, Backend, StoreConfig};
pub use errors::Result;
pub use repo::{PostgresRepository, SqliteRepository};
