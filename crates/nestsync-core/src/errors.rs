use nestsync_core_types::{SyncRunId, TraceId};
use thiserror::Error;

/// Result type alias using SyncError
pub type Result<T> = std::result::Result<T, SyncError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code used in structured logs, the CLI's
/// exit message and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Lookup
    NotFound,
    AssociationNotFound,
    EntityNotFound,

    // Input / validation
    InvalidInput,
    InvalidId,
    InvalidPayload,
    UnknownAttribute,
    RecordInvalid,

    // Declaration
    DuplicateDeclaration,
    InvalidSchema,

    // Integration/IO
    Io,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AssociationNotFound => "ERR_ASSOCIATION_NOT_FOUND",
            ExErrorKind::EntityNotFound => "ERR_ENTITY_NOT_FOUND",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidId => "ERR_INVALID_ID",
            ExErrorKind::InvalidPayload => "ERR_INVALID_PAYLOAD",
            ExErrorKind::UnknownAttribute => "ERR_UNKNOWN_ATTRIBUTE",
            ExErrorKind::RecordInvalid => "ERR_RECORD_INVALID",
            ExErrorKind::DuplicateDeclaration => "ERR_DUPLICATE_DECLARATION",
            ExErrorKind::InvalidSchema => "ERR_INVALID_SCHEMA",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification (`kind`) for programmatic handling plus optional
/// context about where the failure happened.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity: Option<String>,
    record_id: Option<String>,
    association: Option<String>,
    run_id: Option<SyncRunId>,
    trace_id: Option<TraceId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            record_id: None,
            association: None,
            run_id: None,
            trace_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity (table) context
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Add record id context
    pub fn with_record_id(mut self, id: impl Into<String>) -> Self {
        self.record_id = Some(id.into());
        self
    }

    /// Add association context
    pub fn with_association(mut self, association: impl Into<String>) -> Self {
        self.association = Some(association.into());
        self
    }

    pub fn with_run_id(mut self, run_id: SyncRunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    pub fn association(&self) -> Option<&str> {
        self.association.as_deref()
    }

    pub fn run_id(&self) -> Option<&SyncRunId> {
        self.run_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity) = &self.entity {
            write!(f, " (entity: {})", entity)?;
        }
        if let Some(id) = &self.record_id {
            write!(f, " (id: {})", id)?;
        }
        if let Some(association) = &self.association {
            write!(f, " (association: {})", association)?;
        }
        if let Some(run_id) = &self.run_id {
            write!(f, " (run_id: {})", run_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Domain errors raised while declaring or running nested reconciliation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// A submitted id does not belong to any child of the parent
    #[error("Couldn't find {entity} with id={id} in association {association}")]
    RecordNotFound {
        entity: String,
        association: String,
        id: String,
    },

    /// A child or parent failed validation and was not persisted
    #[error("Validation failed for {entity}: {}", .errors.join(", "))]
    RecordInvalid { entity: String, errors: Vec<String> },

    /// An attribute name is not a column of the entity
    #[error("Unknown attribute '{attribute}' for {entity}")]
    UnknownAttribute { entity: String, attribute: String },

    /// A submitted id could not be normalized
    #[error("Invalid record id: {reason}")]
    InvalidId { reason: String },

    /// The submitted payload is not a sequence of attribute maps
    #[error("Invalid payload for '{from}': {reason}")]
    InvalidPayload { from: String, reason: String },

    /// Declaration names an association the entity does not have
    #[error("Association '{association}' not found on {entity}")]
    AssociationNotFound { entity: String, association: String },

    /// Entity (table) is not part of the schema
    #[error("Entity not found: {entity}")]
    EntityNotFound { entity: String },

    /// Record lookup by id failed outside of an association scope
    #[error("Couldn't find {entity} with id={id}")]
    NotFound { entity: String, id: String },

    /// Same association declared twice for one entity
    #[error("Nested attributes for '{association}' already declared on {entity}")]
    DuplicateDeclaration { entity: String, association: String },

    /// Schema is internally inconsistent
    #[error("Invalid schema: {reason}")]
    InvalidSchema { reason: String },

    /// Underlying persistence layer failed
    #[error("Persistence error in {op}: {message}")]
    Persistence { op: String, message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<SyncError> for ExError {
    fn from(err: SyncError) -> Self {
        let message = err.to_string();
        match err {
            SyncError::RecordNotFound {
                entity,
                association,
                id,
            } => ExError::new(ExErrorKind::NotFound)
                .with_op("find_child")
                .with_entity(entity)
                .with_association(association)
                .with_record_id(id)
                .with_message(message),

            SyncError::RecordInvalid { entity, .. } => ExError::new(ExErrorKind::RecordInvalid)
                .with_op("save_record")
                .with_entity(entity)
                .with_message(message),

            SyncError::UnknownAttribute { entity, .. } => {
                ExError::new(ExErrorKind::UnknownAttribute)
                    .with_op("assign_attributes")
                    .with_entity(entity)
                    .with_message(message)
            }

            SyncError::InvalidId { .. } => ExError::new(ExErrorKind::InvalidId).with_message(message),

            SyncError::InvalidPayload { .. } => ExError::new(ExErrorKind::InvalidPayload)
                .with_op("decode_payload")
                .with_message(message),

            SyncError::AssociationNotFound {
                entity,
                association,
            } => ExError::new(ExErrorKind::AssociationNotFound)
                .with_op("declare_nested")
                .with_entity(entity)
                .with_association(association)
                .with_message(message),

            SyncError::EntityNotFound { entity } => ExError::new(ExErrorKind::EntityNotFound)
                .with_entity(entity)
                .with_message(message),

            SyncError::NotFound { entity, id } => ExError::new(ExErrorKind::NotFound)
                .with_op("find_record")
                .with_entity(entity)
                .with_record_id(id)
                .with_message(message),

            SyncError::DuplicateDeclaration {
                entity,
                association,
            } => ExError::new(ExErrorKind::DuplicateDeclaration)
                .with_op("declare_nested")
                .with_entity(entity)
                .with_association(association)
                .with_message(message),

            SyncError::InvalidSchema { .. } => {
                ExError::new(ExErrorKind::InvalidSchema).with_message(message)
            }

            SyncError::Persistence { op, message } => ExError::new(ExErrorKind::Persistence)
                .with_op(op)
                .with_message(message),

            SyncError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization {
            message: err.to_string(),
        }
    }
}
