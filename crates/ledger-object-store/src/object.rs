//! The record type stored in an index.

use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::TypedId;
use std::fmt::Debug;

/// An identity-bearing record. The id is assigned by the owning index at
/// creation and never changes afterwards.
pub trait Object: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Id: TypedId;

    fn id(&self) -> Self::Id;
}
