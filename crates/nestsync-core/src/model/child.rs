use serde::Serialize;

use super::attributes::Attributes;
use super::record_id::RecordId;

/// A child record as seen by the reconciler
///
/// `id` is `None` until the record has been persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildRecord {
    pub id: Option<RecordId>,
    pub attributes: Attributes,
}

impl ChildRecord {
    /// A not-yet-persisted child
    pub fn new_record(attributes: Attributes) -> Self {
        Self {
            id: None,
            attributes,
        }
    }

    /// A child loaded from storage
    pub fn persisted(id: RecordId, attributes: Attributes) -> Self {
        Self {
            id: Some(id),
            attributes,
        }
    }

    pub fn is_new_record(&self) -> bool {
        self.id.is_none()
    }

    /// Assign attributes, keeping any attribute not mentioned in `attributes`
    pub fn assign(&mut self, attributes: &Attributes) {
        self.attributes.merge(attributes);
    }
}
