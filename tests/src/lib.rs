//! # Ledger Test Suite
//!
//! End-to-end scenarios run against a full [`ledger_chain::Database`].
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/      # Scenarios across the whole pipeline
//! │   ├── transactions.rs   # atomicity, dupe/TaPoS/expiry, fees
//! │   ├── authority.rs      # multisig thresholds, depth, signatures
//! │   ├── blocks.rs         # production, pop, fork switch, replay
//! │   ├── proposals.rs      # approvals, review, committee parameters
//! │   └── balances.rs       # genesis claimable balances
//! └── benches/              # criterion benchmarks
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ledger-tests
//! cargo test -p ledger-tests integration::blocks
//! cargo bench -p ledger-tests
//! ```

pub mod integration;
