// Repository interfaces (ports)
// The core only ever sees these traits; adapters live in infrastructure

pub mod artifact_store;
pub mod entity_store;
pub mod records;

pub use artifact_store::ArtifactStore;
pub use entity_store::{EntityKind, EntityStore};
pub use records::Records;
