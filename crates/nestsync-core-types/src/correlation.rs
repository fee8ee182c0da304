//! Correlation types for tying log lines and journal rows to one save
//!
//! Every parent save that triggers nested reconciliation gets a `SyncRunId`.
//! The id is written to each structured log event of the run and to every
//! journal row the run produces, so a failed or surprising sync can be traced
//! back to the request that caused it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_v7_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh, time-ordered id (UUIDv7)
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Wrap an id received from elsewhere (journal rows, headers)
            pub fn from_string(s: String) -> Self {
                Self(s)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

uuid_v7_id!(
    /// Identifier of one save-and-reconcile run
    SyncRunId
);

uuid_v7_id!(
    /// Caller-supplied trace identifier, propagated when the save is part of a
    /// larger distributed request
    TraceId
);

/// Correlation context carried from the caller into a save
#[derive(Debug, Clone)]
pub struct SaveContext {
    pub run_id: SyncRunId,
    pub trace_id: Option<TraceId>,
}

impl SaveContext {
    pub fn new() -> Self {
        Self {
            run_id: SyncRunId::new(),
            trace_id: None,
        }
    }

    /// Attach the caller's trace id
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

impl Default for SaveContext {
    fn default() -> Self {
        Self::new()
    }
}
