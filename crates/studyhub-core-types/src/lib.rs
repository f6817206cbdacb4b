//! Core types shared by the StudyHub storage crates
//!
//! - **Schema constants**: canonical logging field keys and event names
//! - **Sensitive data**: `Sensitive<T>` and `MaskedEmail` for log redaction

pub mod schema;
pub mod sensitive;

pub use sensitive::{MaskedEmail, Sensitive};
