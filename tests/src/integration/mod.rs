//! # Integration Scenarios
//!
//! Every scenario drives the ledger through its public surface only:
//! signed transactions, produced blocks and snapshots.

pub mod authority;
pub mod balances;
pub mod blocks;
pub mod proposals;
pub mod transactions;
