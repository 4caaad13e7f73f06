//! # Canonical Codec
//!
//! Two encodings are part of the protocol:
//!
//! - **Packed**: `bincode` with variable-length integers. Used for ids,
//!   digests, signatures and size-priced fees. Small fee values encode in
//!   fewer bytes, which is why fee calculation has to stabilise.
//! - **Variant**: `serde_json::Value`, used for logging and APIs.

use crate::errors::ProtocolError;
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest as _, Sha256};

/// A 32-byte SHA-256 output.
pub type Digest = [u8; 32];

fn options() -> impl Options {
    bincode::DefaultOptions::new()
}

/// Encodes a value into its canonical packed form.
pub fn pack<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    options()
        .serialize(value)
        .map_err(|e| ProtocolError::Codec(e.to_string()))
}

/// Decodes a packed value; trailing bytes are an error.
pub fn unpack<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    options()
        .deserialize(bytes)
        .map_err(|e| ProtocolError::Codec(e.to_string()))
}

/// Size in bytes of the packed form, without allocating it.
pub fn packed_size<T: Serialize + ?Sized>(value: &T) -> Result<u64, ProtocolError> {
    options()
        .serialized_size(value)
        .map_err(|e| ProtocolError::Codec(e.to_string()))
}

pub fn to_variant<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value, ProtocolError> {
    serde_json::to_value(value).map_err(|e| ProtocolError::Codec(e.to_string()))
}

pub fn from_variant<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|e| ProtocolError::Codec(e.to_string()))
}

pub fn sha256(bytes: &[u8]) -> Digest {
    Sha256::digest(bytes).into()
}

/// SHA-256 of the packed form of `value`.
pub fn hash_packed<T: Serialize + ?Sized>(value: &T) -> Result<Digest, ProtocolError> {
    Ok(sha256(&pack(value)?))
}
