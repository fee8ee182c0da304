pub mod attributes;
pub mod child;
pub mod payload;
pub mod record_id;
pub mod schema;

pub use attributes::Attributes;
pub use child::ChildRecord;
pub use payload::Payload;
pub use record_id::RecordId;
pub use schema::{AssociationDef, EntityDef, NestedDecl, Schema, ID_COLUMN, POSITION_COLUMN};
