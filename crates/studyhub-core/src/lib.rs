//! StudyHub Core - content storage abstraction
//!
//! This crate provides:
//! - the domain model (users, main topics, classes, lessons, progress) and
//!   the insert payloads / partial-update patches that create and change it
//! - the async [`Repository`] contract every storage backend implements
//! - the hierarchy assembler and search matcher shared by all backends
//! - [`MemoryRepository`], the in-process reference backend
//! - the structured error and logging facilities, and a logging decorator
//! - sample-content seeding
//!
//! Relational backends live in `studyhub-store`.

pub mod commands;
pub mod errors;
pub mod hierarchy;
pub mod logged;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod repository;
pub mod search;
pub mod seed;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Used by the exported logging macros
pub use studyhub_core_types;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, Result, StudyHubError};
pub use logged::LoggedRepository;
pub use model::{
    Class, ClassWithLessons, Lesson, LessonWithProgress, MainTopic, MainWithClasses, User,
    UserProgress,
};
pub use ops::MemoryRepository;
pub use repository::{Repository, Visibility};
