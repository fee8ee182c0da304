pub mod association;
pub mod reconcile;
pub mod store;

pub use association::{Association, AssociationCatalog, AssociationSource};
pub use reconcile::{reconcile, ReconcileReport};
pub use store::Store;
