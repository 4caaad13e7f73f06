//! # Outbound Ports
//!
//! Services the ledger consumes but does not implement: signature
//! verification, a block-time source and snapshot persistence.

use shared_types::{Digest, PublicKey, Signature, TimePointSec};
use thiserror::Error;

/// Verifies one signature over a transaction digest.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, key: &PublicKey, digest: &Digest, signature: &Signature) -> bool;
}

/// Source of block timestamps for block production.
pub trait BlockClock: Send + Sync {
    /// Timestamp of the block following a head produced at `head_time`.
    fn next_block_time(&self, head_time: TimePointSec, block_interval: u8) -> TimePointSec;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("Snapshot storage failure: {0}")]
    Storage(String),

    #[error("Snapshot is corrupt: {0}")]
    Corrupt(String),
}

/// Persistence of packed database images, keyed by block number.
pub trait SnapshotStore: Send + Sync {
    fn save(&self, block_num: u32, image: Vec<u8>) -> Result<(), SnapshotError>;

    /// Newest snapshot taken at or before `block_num`.
    fn load_nearest(&self, block_num: u32) -> Result<Option<(u32, Vec<u8>)>, SnapshotError>;

    /// Drops every snapshot older than `keep_after`. Returns how many went.
    fn prune(&self, keep_after: u32) -> Result<usize, SnapshotError>;
}
