//! # Ledger Chain
//!
//! Deterministic state machine of an account-based ledger. Given the same
//! genesis and the same blocks, every node reaches the same object state.
//!
//! ## Layers
//!
//! ```text
//! Database (database/)        block, transaction and proposal pipelines
//!   ├─ evaluator/             two-phase rules of every operation
//!   ├─ domain/                objects, indexes, authority verification
//!   └─ ObjectDatabase         ledger-object-store: indexes + undo sessions
//! ```
//!
//! ## Guarantees
//!
//! - A transaction takes effect entirely or not at all.
//! - Every applied block can be popped again while it is within the
//!   configured undo history.
//! - Evaluation never writes. Once every operation of a transaction
//!   evaluated, applying it cannot fail without halting the database.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ledger_chain::{ChainConfig, Database, Ed25519Verifier, GenesisConfig};
//!
//! let genesis = GenesisConfig::new(committee_key, TimePointSec(1_600_000_000));
//! let mut db = Database::open(ChainConfig::from_env(), &genesis, Arc::new(Ed25519Verifier))?;
//! db.push_transaction(signed)?;
//! let block = db.generate_next_block(&FixedIntervalClock)?;
//! ```

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod database;
pub mod domain;
pub mod errors;
pub mod evaluator;
pub mod ports;

/// Funded test chain with named accounts.
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use adapters::{Ed25519KeyPair, Ed25519Verifier, FixedIntervalClock, InMemorySnapshotStore};
pub use config::{ChainConfig, GenesisAccount, GenesisBalance, GenesisClaimableBalance, GenesisConfig};
pub use database::{AssetDataDelta, ChainSnapshot, Database};
pub use domain::SkipFlags;
pub use errors::{ChainError, ErrorKind};
pub use ports::{BlockClock, SignatureVerifier, SnapshotError, SnapshotStore};
