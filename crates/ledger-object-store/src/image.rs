//! Serializable snapshot of every registered index.
//!
//! Objects are kept in their canonical packed form so that an image can be
//! stored and compared without knowing the concrete object types.

use serde::{Deserialize, Serialize};
use shared_types::SpaceTypeId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexImage {
    pub space: u8,
    pub type_id: u8,
    pub next_instance: u64,
    /// Packed objects in id order.
    pub objects: Vec<Vec<u8>>,
}

impl IndexImage {
    pub fn space_type(&self) -> SpaceTypeId {
        SpaceTypeId::new(self.space, self.type_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseImage {
    /// One entry per registered index, ordered by partition.
    pub indexes: Vec<IndexImage>,
}

impl DatabaseImage {
    pub fn index(&self, space_type: SpaceTypeId) -> Option<&IndexImage> {
        self.indexes
            .iter()
            .find(|image| image.space_type() == space_type)
    }

    pub fn object_count(&self) -> usize {
        self.indexes.iter().map(|image| image.objects.len()).sum()
    }
}
