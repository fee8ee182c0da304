//! Collaborator contracts the reconciler needs from a persistence layer

use crate::errors::Result;
use crate::model::{ChildRecord, RecordId};

/// One parent's has-many association
///
/// A handle is opened for a specific, already persisted parent; every method
/// is scoped to that parent's children.
pub trait Association {
    /// Name of the child entity (used in error messages)
    fn child_entity(&self) -> &str;

    /// Name of the association on the parent
    fn name(&self) -> &str;

    /// Child column holding the parent's id
    fn foreign_key(&self) -> &str;

    /// Whether the child entity defines a `position` column
    fn has_position_column(&self) -> bool;

    /// Ids of all children currently associated with the parent
    fn current_ids(&self) -> Result<Vec<RecordId>>;

    /// Find a child by id within the association
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if the id is not one of the parent's children.
    fn find(&self, id: &RecordId) -> Result<ChildRecord>;

    /// Instantiate a new, unsaved child already linked to the parent
    fn build(&self) -> ChildRecord;

    /// Validate and persist `record` (insert when new, update otherwise),
    /// returning its id. On insert the id is also written back to `record`.
    ///
    /// # Errors
    ///
    /// Returns `RecordInvalid` or `UnknownAttribute` when validation fails, or
    /// `Persistence` when the write fails.
    fn save(&mut self, record: &mut ChildRecord) -> Result<RecordId>;

    /// Delete the given children of the parent, returning how many were removed
    ///
    /// # Errors
    ///
    /// Returns `Persistence` when the delete fails.
    fn delete_ids(&mut self, ids: &[RecordId]) -> Result<usize>;
}

/// Opens association handles for persisted parents
pub trait AssociationSource {
    /// # Errors
    ///
    /// Returns `AssociationNotFound` for undeclared associations and
    /// `NotFound` when the parent record does not exist.
    fn open<'s>(
        &'s mut self,
        entity: &str,
        association: &str,
        parent_id: &RecordId,
    ) -> Result<Box<dyn Association + 's>>;
}

/// Declaration-time introspection of which associations exist
pub trait AssociationCatalog {
    fn has_association(&self, entity: &str, association: &str) -> bool;
}
