//! # Transactions
//!
//! An ordered list of operations bound to a recent block (TaPoS) and an
//! expiration. Signatures cover `chain_id ‖ packed transaction`, so a
//! transaction is only valid on the chain it was signed for.

use crate::asset::Asset;
use crate::authority::RequiredAuthorities;
use crate::block::BlockId;
use crate::codec::{self, Digest};
use crate::errors::ProtocolError;
use crate::ids::ObjectId;
use crate::keys::{PublicKey, Signature};
use crate::operations::Operation;
use crate::time::TimePointSec;
use serde::{Deserialize, Serialize};

/// Identifies a chain; mixed into every signed digest.
pub type ChainId = Digest;

pub type TransactionId = Digest;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Low 16 bits of the referenced block's number.
    pub ref_block_num: u16,
    /// Bytes 4..8 of the referenced block's id.
    pub ref_block_prefix: u32,
    pub expiration: TimePointSec,
    pub operations: Vec<Operation>,
}

impl Transaction {
    pub fn id(&self) -> Result<TransactionId, ProtocolError> {
        codec::hash_packed(self)
    }

    /// Message signed by every key of the transaction.
    pub fn digest(&self, chain_id: &ChainId) -> Result<Digest, ProtocolError> {
        let packed = codec::pack(self)?;
        let mut message = Vec::with_capacity(chain_id.len() + packed.len());
        message.extend_from_slice(chain_id);
        message.extend_from_slice(&packed);
        Ok(codec::sha256(&message))
    }

    pub fn set_reference_block(&mut self, reference: &BlockId) {
        self.ref_block_num = reference.block_num() as u16;
        self.ref_block_prefix = reference.ref_prefix();
    }

    pub fn set_expiration(&mut self, expiration: TimePointSec) {
        self.expiration = expiration;
    }

    /// Stateless checks: at least one operation, every operation valid.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.operations.is_empty() {
            return Err(ProtocolError::InvalidOperation {
                operation: "transaction",
                reason: "a transaction must have at least one operation".into(),
            });
        }
        self.operations.iter().try_for_each(Operation::validate)
    }

    pub fn required_authorities(&self) -> RequiredAuthorities {
        let mut auths = RequiredAuthorities::default();
        for op in &self.operations {
            op.required_authorities(&mut auths);
        }
        auths
    }
}

/// A signature together with the key that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySignature {
    pub key: PublicKey,
    pub signature: Signature,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signatures: Vec<KeySignature>,
}

impl SignedTransaction {
    pub fn new(transaction: Transaction) -> Self {
        Self {
            transaction,
            signatures: Vec::new(),
        }
    }

    /// Id of the unsigned transaction; signatures do not change it.
    pub fn id(&self) -> Result<TransactionId, ProtocolError> {
        self.transaction.id()
    }

    /// Leaf of the block's transaction merkle tree; covers the signatures.
    pub fn merkle_digest(&self) -> Result<Digest, ProtocolError> {
        codec::hash_packed(self)
    }

    pub fn add_signature(&mut self, key: PublicKey, signature: Signature) {
        self.signatures.push(KeySignature { key, signature });
    }
}

/// What an operation's apply produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationResult {
    Void,
    /// Id of the object the operation created.
    ObjectId(ObjectId),
    /// Amount the operation moved, e.g. a claimed balance.
    Asset(Asset),
}

/// A signed transaction together with the results of its operations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedTransaction {
    pub signed: SignedTransaction,
    pub operation_results: Vec<OperationResult>,
}
