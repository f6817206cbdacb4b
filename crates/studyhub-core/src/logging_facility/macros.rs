//! Canonical operation logging macros
//!
//! Field names come from `studyhub_core_types::schema`, re-exported by this
//! crate, so callers only need `studyhub-core` and `tracing`.

/// Log the start of an operation
///
/// ```
/// # use studyhub_core::log_op_start;
/// log_op_start!("get_mains");
/// log_op_start!("get_lessons", class_id = "c1");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::studyhub_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::studyhub_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// ```
/// # use studyhub_core::log_op_end;
/// log_op_end!("get_mains", duration_ms = 3);
/// log_op_end!("search_lessons", duration_ms = 3, result_len = 12);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::studyhub_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::studyhub_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log a failed operation with its error kind and code
///
/// `$err` is anything convertible into `ExError`.
///
/// ```
/// # use studyhub_core::log_op_error;
/// # use studyhub_core::errors::{ExError, ExErrorKind};
/// let err = ExError::new(ExErrorKind::Connectivity);
/// log_op_error!("get_mains", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::studyhub_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::studyhub_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            $($field)*
        );
    }};
}
