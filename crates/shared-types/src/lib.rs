//! # Shared Types Crate
//!
//! The protocol surface of the ledger: everything that is signed, hashed or
//! sent over the wire, and the stateless rules attached to it.
//!
//! ## Design Principles
//!
//! - **Closed operation set**: [`Operation`] is a plain enum; its variant
//!   index is the wire tag and the engine's dispatch key.
//! - **Canonical encoding**: [`codec`] defines the one packed form used for
//!   ids, digests and size-priced fees, plus the JSON variant form.
//! - **No ledger state**: nothing here reads the database. Checks that need
//!   state belong to the evaluators.

pub mod asset;
pub mod authority;
pub mod block;
pub mod chain_parameters;
pub mod codec;
pub mod errors;
pub mod fee_schedule;
pub mod ids;
pub mod keys;
pub mod operations;
pub mod time;
pub mod transaction;

pub use asset::*;
pub use authority::*;
pub use block::*;
pub use chain_parameters::*;
pub use codec::Digest;
pub use errors::*;
pub use fee_schedule::*;
pub use ids::*;
pub use keys::*;
pub use operations::*;
pub use time::*;
pub use transaction::*;

#[doc(hidden)]
pub use serde as __serde;
