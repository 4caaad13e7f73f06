//! # Ledger Object Store
//!
//! In-memory object database the ledger state lives in.
//!
//! - One [`GenericIndex`] per object type, addressed by `(space, type)`.
//! - Pluggable [`SecondaryIndex`]es kept in sync with every mutation.
//! - Nested undo sessions with merge, commit and undo, plus a bounded
//!   history of committed revisions for switching forks.
//! - [`DatabaseImage`] snapshots in canonical packed form.

pub mod database;
pub mod errors;
pub mod image;
pub mod index;
pub mod object;
pub mod secondary;
pub mod undo;

pub use database::{ObjectDatabase, UndoGuard};
pub use errors::DbError;
pub use image::{DatabaseImage, IndexImage};
pub use index::{GenericIndex, SecondaryIndex};
pub use object::Object;
pub use secondary::{OrderedIndex, UniqueIndex};
pub use undo::{UndoSession, DEFAULT_MAX_UNDO_HISTORY};
