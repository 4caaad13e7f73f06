//! # Error Types
//!
//! Every error except `NotFound` means the store was used in a way that
//! must never happen on a correct node. Callers treat those as fatal.

use shared_types::{ObjectId, SpaceTypeId};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DbError {
    /// No object with this id exists in its index.
    #[error("Object not found: {0}")]
    NotFound(ObjectId),

    #[error("Index {0} is not registered")]
    IndexNotRegistered(SpaceTypeId),

    #[error("Index {0} is already registered")]
    IndexAlreadyRegistered(SpaceTypeId),

    /// A mutator or initializer changed the object's id.
    #[error("Object id changed from {before} to {after}")]
    IdMutated { before: ObjectId, after: ObjectId },

    /// An object with this id is already present.
    #[error("Instance already occupied: {0}")]
    InstanceOccupied(ObjectId),

    /// A unique secondary index already maps the key to another object.
    #[error("Unique index {index} already maps the key to {existing}")]
    UniqueViolation {
        index: &'static str,
        existing: ObjectId,
    },

    /// A session was merged, committed or undone while a newer one is open.
    #[error("Undo session {session} is not the innermost session ({innermost:?})")]
    SessionOutOfOrder { session: u64, innermost: Option<u64> },

    #[error("No undo history to pop")]
    NoUndoHistory,

    #[error("{0} undo sessions are still active")]
    ActiveSessions(usize),

    /// The index registered under this partition holds another type.
    #[error("Index {0} holds a different object type")]
    TypeMismatch(SpaceTypeId),

    /// An image does not match the registered indexes.
    #[error("Image mismatch: {0}")]
    ImageMismatch(String),

    #[error("Codec error: {0}")]
    Codec(String),
}

impl DbError {
    /// Programming or consistency error; continuing risks divergence.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DbError::NotFound(_))
    }
}

impl From<shared_types::ProtocolError> for DbError {
    fn from(err: shared_types::ProtocolError) -> Self {
        DbError::Codec(err.to_string())
    }
}
