//! Migration framework
//!
//! Provides:
//! - one runner per dialect, with checksums and idempotent application
//! - SQL embedded into the binary

mod checksums;
mod embedded;
pub mod postgres;
mod runner;

pub use runner::{applied_migrations, apply_migrations};
