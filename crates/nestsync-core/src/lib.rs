//! nestsync core - nested child-collection reconciliation
//!
//! Synchronizes a parent record's has-many children from a batch of submitted
//! attribute sets in one save:
//! - Data model: record ids, attribute maps, payloads, schema definitions
//! - Declarations: `NestedConfig` and the `NestedRegistry` built at setup
//! - The reconciler and the after-save hook runner
//! - Collaborator traits a persistence layer implements, plus an in-memory store
//! - Structured error and logging facilities shared by the other crates

pub mod apply;
pub mod config;
pub mod errors;
pub mod form;
pub mod hooks;
pub mod logging_facility;
pub mod model;
pub mod ops;

// Used by the exported logging macros.
#[doc(hidden)]
pub use nestsync_core_types;

pub use apply::{apply_save, AppliedSave, SaveCommand};
pub use config::{Declaration, NestedConfig, NestedRegistry};
pub use errors::{ExError, ExErrorKind, Result, SyncError};
pub use form::SubmittedForm;
pub use hooks::{run_after_save, AfterSaveOutcome, AssociationReport, SyncState};
pub use model::{Attributes, ChildRecord, Payload, RecordId, Schema};
pub use ops::{reconcile, Association, AssociationCatalog, AssociationSource, ReconcileReport, Store};
