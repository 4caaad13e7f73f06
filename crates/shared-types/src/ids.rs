//! # Object Identifiers
//!
//! Every stored record is addressed by a `(space, type, instance)` triple.
//! The space separates protocol objects (referenced from operations) from
//! implementation objects (bookkeeping owned by the engine); the type picks
//! the index; the instance is the sequential slot inside that index.
//!
//! ## Encoding
//!
//! - Binary: a single `u64`, `space << 56 | type << 48 | instance`.
//! - Human readable: the string `"space.type.instance"`.
//!
//! Strongly typed ids (`AccountId`, `AssetId`, ...) are declared with the
//! [`typed_id!`](crate::typed_id) macro and encode only their instance in
//! binary form, the full triple in JSON.

use crate::errors::ProtocolError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// Space of objects referenced by operations.
pub const PROTOCOL_SPACE: u8 = 1;

/// Space of objects maintained by the engine itself.
pub const IMPLEMENTATION_SPACE: u8 = 2;

/// Largest instance number representable in the packed form.
pub const MAX_INSTANCE: u64 = (1 << 48) - 1;

/// Untyped object id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId {
    space: u8,
    type_id: u8,
    instance: u64,
}

impl ObjectId {
    pub const fn new(space: u8, type_id: u8, instance: u64) -> Self {
        Self {
            space,
            type_id,
            instance,
        }
    }

    pub fn space(&self) -> u8 {
        self.space
    }

    pub fn type_id(&self) -> u8 {
        self.type_id
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn space_type(&self) -> SpaceTypeId {
        SpaceTypeId::new(self.space, self.type_id)
    }

    /// Packs the id into its single-integer wire form.
    pub fn to_u64(&self) -> u64 {
        (u64::from(self.space) << 56) | (u64::from(self.type_id) << 48) | (self.instance & MAX_INSTANCE)
    }

    pub fn from_u64(packed: u64) -> Self {
        Self {
            space: (packed >> 56) as u8,
            type_id: (packed >> 48) as u8,
            instance: packed & MAX_INSTANCE,
        }
    }

    /// Narrows to a typed id, failing if the partition differs.
    pub fn as_typed<T: TypedId>(&self) -> Result<T, ProtocolError> {
        T::try_from_object_id(*self)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.space, self.type_id, self.instance)
    }
}

impl FromStr for ObjectId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidObjectId(s.to_string());
        let mut parts = s.split('.');
        let space = parts.next().ok_or_else(invalid)?.parse::<u8>().map_err(|_| invalid())?;
        let type_id = parts.next().ok_or_else(invalid)?.parse::<u8>().map_err(|_| invalid())?;
        let instance = parts.next().ok_or_else(invalid)?.parse::<u64>().map_err(|_| invalid())?;
        if parts.next().is_some() || instance > MAX_INSTANCE {
            return Err(invalid());
        }
        Ok(Self::new(space, type_id, instance))
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_u64(self.to_u64())
        }
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            text.parse().map_err(de::Error::custom)
        } else {
            u64::deserialize(deserializer).map(Self::from_u64)
        }
    }
}

/// The `(space, type)` partition of an id, naming one index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpaceTypeId {
    pub space: u8,
    pub type_id: u8,
}

impl SpaceTypeId {
    pub const fn new(space: u8, type_id: u8) -> Self {
        Self { space, type_id }
    }
}

impl fmt::Display for SpaceTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.space, self.type_id)
    }
}

/// An id bound at compile time to one `(space, type)` partition.
pub trait TypedId:
    Copy + Eq + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    const SPACE_ID: u8;
    const TYPE_ID: u8;

    fn from_instance(instance: u64) -> Self;

    fn instance(&self) -> u64;

    fn object_id(&self) -> ObjectId {
        ObjectId::new(Self::SPACE_ID, Self::TYPE_ID, self.instance())
    }

    fn space_type() -> SpaceTypeId {
        SpaceTypeId::new(Self::SPACE_ID, Self::TYPE_ID)
    }

    fn try_from_object_id(id: ObjectId) -> Result<Self, ProtocolError> {
        if id.space_type() != Self::space_type() {
            return Err(ProtocolError::WrongIdType {
                expected: Self::space_type().to_string(),
                actual: id.to_string(),
            });
        }
        Ok(Self::from_instance(id.instance()))
    }
}

#[doc(hidden)]
pub fn serialize_typed<T: TypedId, S: Serializer>(id: &T, serializer: S) -> Result<S::Ok, S::Error> {
    if serializer.is_human_readable() {
        serializer.collect_str(&id.object_id())
    } else {
        serializer.serialize_u64(id.instance())
    }
}

#[doc(hidden)]
pub fn deserialize_typed<'de, T: TypedId, D: Deserializer<'de>>(deserializer: D) -> Result<T, D::Error> {
    if deserializer.is_human_readable() {
        let text = String::deserialize(deserializer)?;
        let id: ObjectId = text.parse().map_err(de::Error::custom)?;
        T::try_from_object_id(id).map_err(de::Error::custom)
    } else {
        u64::deserialize(deserializer).map(T::from_instance)
    }
}

/// Declares a strongly typed id bound to one `(space, type)` partition.
///
/// ```
/// use shared_types::{typed_id, TypedId};
///
/// typed_id! {
///     /// Widgets live in 2.42.
///     pub struct WidgetId(2, 42);
/// }
///
/// assert_eq!(WidgetId(7).object_id().to_string(), "2.42.7");
/// ```
#[macro_export]
macro_rules! typed_id {
    ($(#[$meta:meta])* $vis:vis struct $name:ident($space:expr, $type_id:expr);) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        $vis struct $name(pub u64);

        impl $crate::ids::TypedId for $name {
            const SPACE_ID: u8 = $space;
            const TYPE_ID: u8 = $type_id;

            fn from_instance(instance: u64) -> Self {
                Self(instance)
            }

            fn instance(&self) -> u64 {
                self.0
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}.{}.{}", $space, $type_id, self.0)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}.{}.{}", $space, $type_id, self.0)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::errors::ProtocolError;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let id: $crate::ids::ObjectId = s.parse()?;
                <Self as $crate::ids::TypedId>::try_from_object_id(id)
            }
        }

        impl ::std::convert::From<$name> for $crate::ids::ObjectId {
            fn from(id: $name) -> Self {
                $crate::ids::TypedId::object_id(&id)
            }
        }

        impl $crate::__serde::Serialize for $name {
            fn serialize<S: $crate::__serde::Serializer>(
                &self,
                serializer: S,
            ) -> ::std::result::Result<S::Ok, S::Error> {
                $crate::ids::serialize_typed(self, serializer)
            }
        }

        impl<'de> $crate::__serde::Deserialize<'de> for $name {
            fn deserialize<D: $crate::__serde::Deserializer<'de>>(
                deserializer: D,
            ) -> ::std::result::Result<Self, D::Error> {
                $crate::ids::deserialize_typed(deserializer)
            }
        }
    };
}

// =============================================================================
// PROTOCOL IDS
// =============================================================================

typed_id! {
    /// Account (1.2.x).
    pub struct AccountId(PROTOCOL_SPACE, 2);
}

typed_id! {
    /// Asset (1.3.x).
    pub struct AssetId(PROTOCOL_SPACE, 3);
}

typed_id! {
    /// Open limit order (1.7.x).
    pub struct LimitOrderId(PROTOCOL_SPACE, 7);
}

typed_id! {
    /// Pending proposed transaction (1.10.x).
    pub struct ProposalId(PROTOCOL_SPACE, 10);
}

typed_id! {
    /// Claimable balance (1.15.x).
    pub struct BalanceId(PROTOCOL_SPACE, 15);
}

/// Governance account; may only act through proposals.
pub const COMMITTEE_ACCOUNT: AccountId = AccountId(0);

/// Account with an impossible authority; funds sent here are burned.
pub const NULL_ACCOUNT: AccountId = AccountId(1);

/// Placeholder account used while building transactions.
pub const TEMP_ACCOUNT: AccountId = AccountId(2);

/// The asset fees are denominated in.
pub const CORE_ASSET: AssetId = AssetId(0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_display_and_parse_agree() {
        let id = ObjectId::new(1, 2, 5);
        assert_eq!(id.to_string(), "1.2.5");
        assert_eq!("1.2.5".parse::<ObjectId>().unwrap(), id);
    }

    #[test]
    fn test_object_id_packed_form() {
        let id = ObjectId::new(2, 8, 300);
        assert_eq!(id.to_u64(), (2u64 << 56) | (8u64 << 48) | 300);
        assert_eq!(ObjectId::from_u64(id.to_u64()), id);
    }

    #[test]
    fn test_malformed_ids_rejected() {
        for text in ["", "1.2", "1.2.3.4", "a.b.c", "1.2.-3", "300.1.1"] {
            assert!(
                matches!(text.parse::<ObjectId>(), Err(ProtocolError::InvalidObjectId(_))),
                "{text} should not parse"
            );
        }
    }

    #[test]
    fn test_ordering_is_space_then_type_then_instance() {
        let mut ids = vec![
            ObjectId::new(2, 0, 0),
            ObjectId::new(1, 3, 0),
            ObjectId::new(1, 2, 9),
            ObjectId::new(1, 2, 1),
        ];
        ids.sort();
        assert_eq!(
            ids.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
            vec!["1.2.1", "1.2.9", "1.3.0", "2.0.0"]
        );
    }

    #[test]
    fn test_typed_id_rejects_other_partition() {
        assert_eq!("1.2.7".parse::<AccountId>().unwrap(), AccountId(7));
        assert!(matches!(
            "1.3.7".parse::<AccountId>(),
            Err(ProtocolError::WrongIdType { .. })
        ));
    }

    #[test]
    fn test_typed_id_json_is_full_triple() {
        let json = serde_json::to_string(&AssetId(4)).unwrap();
        assert_eq!(json, "\"1.3.4\"");
        let back: AssetId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AssetId(4));
        assert!(serde_json::from_str::<AssetId>("\"1.2.4\"").is_err());
    }

    #[test]
    fn test_reserved_ids() {
        assert_eq!(COMMITTEE_ACCOUNT.to_string(), "1.2.0");
        assert_eq!(NULL_ACCOUNT.to_string(), "1.2.1");
        assert_eq!(TEMP_ACCOUNT.to_string(), "1.2.2");
        assert_eq!(CORE_ASSET.to_string(), "1.3.0");
    }
}
