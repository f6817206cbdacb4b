//! Structured logging facility
//!
//! - one initialization point, [`init`], called by the hosting binary;
//! - `log_op_start!`, `log_op_end!` and `log_op_error!` for the canonical
//!   `start` / `end` / `end_error` events;
//! - an in-memory capture layer for asserting on events in tests.
//!
//! Repository backends do not log. Wrap one in
//! [`LoggedRepository`](crate::logged::LoggedRepository) to get per-call
//! events.
//!
//! ```rust
//! use studyhub_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
