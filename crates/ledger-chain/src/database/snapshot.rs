//! # Snapshots
//!
//! A [`ChainSnapshot`] is the complete object state at a head block. It is
//! how a node starts without replaying from genesis, and how a halted
//! database is brought back.

use super::Database;
use crate::errors::ChainError;
use crate::ports::{SnapshotError, SnapshotStore};
use ledger_object_store::DatabaseImage;
use serde::{Deserialize, Serialize};
use shared_types::{codec, BlockId};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub block_num: u32,
    pub block_id: BlockId,
    pub image: DatabaseImage,
}

impl Database {
    /// State at the head block, without pending transactions.
    pub fn snapshot(&mut self) -> Result<ChainSnapshot, ChainError> {
        self.ensure_running()?;
        let pending = std::mem::take(&mut self.pending);
        self.clear_pending()?;

        let snapshot = self.export_head();
        for processed in pending {
            if let Err(err) = self.push_transaction(processed.signed) {
                warn!(error = %err, "Pending transaction dropped while snapshotting");
            }
        }
        snapshot
    }

    fn export_head(&self) -> Result<ChainSnapshot, ChainError> {
        Ok(ChainSnapshot {
            block_num: self.head_block_num()?,
            block_id: self.head_block_id()?,
            image: self.objects.export_image()?,
        })
    }

    /// Packs a snapshot into `store`. Returns the block number it was taken at.
    pub fn save_snapshot(&mut self, store: &dyn SnapshotStore) -> Result<u32, ChainError> {
        let snapshot = self.snapshot()?;
        let bytes = codec::pack(&snapshot)?;
        let size = bytes.len();
        store.save(snapshot.block_num, bytes)?;
        info!(block_num = snapshot.block_num, size, "Snapshot saved");
        Ok(snapshot.block_num)
    }

    /// Replaces the whole state with `snapshot`. Pending transactions and
    /// reversible blocks are dropped, and a halted database runs again.
    pub fn restore_snapshot(&mut self, snapshot: &ChainSnapshot) -> Result<(), ChainError> {
        self.pending.clear();
        if let Some(session) = self.pending_session.take() {
            // the image replaces whatever the undo would have restored
            if let Err(err) = self.objects.undo_session(session) {
                warn!(error = %err, "Could not undo pending session before restore");
            }
        }
        self.objects.import_image(&snapshot.image)?;

        let head = self.head_block_id()?;
        if head != snapshot.block_id || self.head_block_num()? != snapshot.block_num {
            return Err(SnapshotError::Corrupt(format!(
                "image head {head} does not match snapshot block {}",
                snapshot.block_id
            ))
            .into());
        }
        self.recent_blocks.clear();
        self.proposal_depth = 0;
        if let Some(reason) = self.halted.take() {
            info!(reason, "Halt cleared by snapshot restore");
        }
        self.update_gauges();
        info!(block_num = snapshot.block_num, "Snapshot restored");
        Ok(())
    }

    /// Restores the newest snapshot in `store` taken at or before
    /// `block_num`. Returns its block number, or `None` if there is none.
    pub fn load_snapshot(
        &mut self,
        store: &dyn SnapshotStore,
        block_num: u32,
    ) -> Result<Option<u32>, ChainError> {
        let Some((found, bytes)) = store.load_nearest(block_num)? else {
            return Ok(None);
        };
        let snapshot: ChainSnapshot = codec::unpack(&bytes)
            .map_err(|err| SnapshotError::Corrupt(err.to_string()))?;
        if snapshot.block_num != found {
            return Err(SnapshotError::Corrupt(format!(
                "stored under block {found} but taken at {}",
                snapshot.block_num
            ))
            .into());
        }
        self.restore_snapshot(&snapshot)?;
        Ok(Some(found))
    }
}
