//! # Blocks
//!
//! A block id is the SHA-256 of the packed header with its first four bytes
//! overwritten by the big-endian block number, so the height can be read
//! back from any id without a lookup.

use crate::codec::{self, Digest};
use crate::errors::ProtocolError;
use crate::time::TimePointSec;
use crate::transaction::SignedTransaction;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BlockId(pub [u8; 32]);

impl BlockId {
    /// Height encoded in the id; the zero id is block 0.
    pub fn block_num(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// The four bytes after the height, used as the TaPoS prefix.
    pub fn ref_prefix(&self) -> u32 {
        u32::from_le_bytes([self.0[4], self.0[5], self.0[6], self.0[7]])
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId(#{} {})", self.block_num(), hex::encode(&self.0[4..12]))
    }
}

impl FromStr for BlockId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| ProtocolError::Codec(format!("block id: {e}")))?;
        Ok(Self(bytes))
    }
}

impl Serialize for BlockId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for BlockId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            text.parse().map_err(de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Self)
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub previous: BlockId,
    pub timestamp: TimePointSec,
    pub transaction_merkle_root: Digest,
}

impl BlockHeader {
    pub fn block_num(&self) -> u32 {
        self.previous.block_num().saturating_add(1)
    }

    pub fn id(&self) -> Result<BlockId, ProtocolError> {
        let mut hash = codec::hash_packed(self)?;
        hash[..4].copy_from_slice(&self.block_num().to_be_bytes());
        Ok(BlockId(hash))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlock {
    pub header: BlockHeader,
    pub transactions: Vec<SignedTransaction>,
}

impl SignedBlock {
    pub fn id(&self) -> Result<BlockId, ProtocolError> {
        self.header.id()
    }

    pub fn block_num(&self) -> u32 {
        self.header.block_num()
    }

    /// Pairwise SHA-256 over the transactions' merkle digests; an odd node
    /// is carried up unchanged, an empty block has the zero root.
    pub fn calculate_merkle_root(&self) -> Result<Digest, ProtocolError> {
        let mut layer = self
            .transactions
            .iter()
            .map(SignedTransaction::merkle_digest)
            .collect::<Result<Vec<_>, _>>()?;
        if layer.is_empty() {
            return Ok([0u8; 32]);
        }
        while layer.len() > 1 {
            layer = layer
                .chunks(2)
                .map(|pair| {
                    if let [left, right] = pair {
                        let mut joined = [0u8; 64];
                        joined[..32].copy_from_slice(left);
                        joined[32..].copy_from_slice(right);
                        codec::sha256(&joined)
                    } else {
                        pair[0]
                    }
                })
                .collect();
        }
        Ok(layer[0])
    }
}
