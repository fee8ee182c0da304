//! Core types shared across nestsync facilities
//!
//! - **Correlation types**: SyncRunId, TraceId, SaveContext
//! - **Schema constants**: Canonical field keys and event names for structured logs

pub mod correlation;
pub mod schema;

pub use correlation::{SaveContext, SyncRunId, TraceId};
