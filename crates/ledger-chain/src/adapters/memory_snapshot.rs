use crate::ports::{SnapshotError, SnapshotStore};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// In-memory implementation of SnapshotStore for testing
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<BTreeMap<u32, Vec<u8>>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn save(&self, block_num: u32, image: Vec<u8>) -> Result<(), SnapshotError> {
        self.snapshots.write().insert(block_num, image);
        Ok(())
    }

    fn load_nearest(&self, block_num: u32) -> Result<Option<(u32, Vec<u8>)>, SnapshotError> {
        let snapshots = self.snapshots.read();
        Ok(snapshots
            .range(..=block_num)
            .next_back()
            .map(|(num, bytes)| (*num, bytes.clone())))
    }

    fn prune(&self, keep_after: u32) -> Result<usize, SnapshotError> {
        let mut snapshots = self.snapshots.write();
        let kept = snapshots.split_off(&keep_after);
        let pruned = snapshots.len();
        *snapshots = kept;
        Ok(pruned)
    }
}
