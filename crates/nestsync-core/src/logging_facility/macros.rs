//! Canonical logging macros
//!
//! Every operation logs one `start` event and exactly one of `end` /
//! `end_error`, all carrying `component` and `op`. A pass that has nothing to
//! do logs a single `skipped` event instead.
//!
//! Each macro expands to a block, so it can be used as a statement or as a
//! `match` arm.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_op {
    ($level:ident, $event:ident, $op:expr $(, $($field:tt)*)?) => {{
        tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $crate::nestsync_core_types::schema::$event,
            $($($field)*)?
        );
    }};
}

/// Log the start of an operation
///
/// ```
/// # use nestsync_core::log_op_start;
/// log_op_start!("reconcile");
/// log_op_start!("reconcile", association = "tasks");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__log_op!(info, EVENT_START, $op $(, $($field)*)?)
    };
}

/// Log the successful end of an operation
///
/// ```
/// # use nestsync_core::log_op_end;
/// let created = 2;
/// match created {
///     0 => log_op_end!("reconcile", duration_ms = 3),
///     n => log_op_end!("reconcile", duration_ms = 3, created = n),
/// }
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__log_op!(info, EVENT_END, $op, duration_ms = $duration $(, $($field)*)?)
    };
}

/// Log an operation that had no work to do
///
/// ```
/// # use nestsync_core::log_op_skipped;
/// log_op_skipped!("reconcile", association = "tasks");
/// ```
#[macro_export]
macro_rules! log_op_skipped {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__log_op!(debug, EVENT_SKIPPED, $op $(, $($field)*)?)
    };
}

/// Log an operation error
///
/// Accepts anything convertible into `ExError` and records its kind and code.
///
/// ```
/// # use nestsync_core::{log_op_error, errors::SyncError};
/// let err = SyncError::EntityNotFound { entity: "task".to_string() };
/// log_op_error!("reconcile", err, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        $crate::__log_op!(
            error,
            EVENT_END_ERROR,
            $op,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            err = %ex_err
            $(, $($field)*)?
        )
    }};
}
