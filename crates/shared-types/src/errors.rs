//! # Error Types
//!
//! Stateless protocol failures: malformed ids, invalid operations,
//! arithmetic overflow and codec errors. Anything that depends on ledger
//! state is reported by the engine crate instead.

use thiserror::Error;

/// Errors raised by protocol types independently of any ledger state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Textual id could not be parsed as `space.type.instance`.
    #[error("Invalid object id: {0}")]
    InvalidObjectId(String),

    /// Object id belongs to a different (space, type) partition.
    #[error("Object id {actual} is not of type {expected}")]
    WrongIdType { expected: String, actual: String },

    /// Stateless `validate()` rule of an operation failed.
    #[error("{operation}: {reason}")]
    InvalidOperation {
        operation: &'static str,
        reason: String,
    },

    /// Authority is empty, impossible or has zero weights.
    #[error("Invalid authority: {0}")]
    InvalidAuthority(String),

    /// Price has a non-positive side or mixes unrelated assets.
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Two amounts of different assets were combined.
    #[error("Asset mismatch: expected {expected}, got {actual}")]
    AssetMismatch { expected: String, actual: String },

    /// Checked arithmetic overflowed or left the share supply range.
    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    /// Scaled fee exceeds the maximum share supply.
    #[error("Fee {fee} exceeds the maximum share supply")]
    FeeOverflow { fee: u128 },

    /// Fee schedule carries two parameter sets for the same operation.
    #[error("Duplicate fee parameters for operation {0}")]
    DuplicateFeeParameters(&'static str),

    /// Chain parameters are out of range.
    #[error("Invalid chain parameters: {0}")]
    InvalidParameters(String),

    /// Canonical binary or JSON encoding failed.
    #[error("Codec error: {0}")]
    Codec(String),
}
