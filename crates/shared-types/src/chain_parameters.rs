//! Protocol knobs changed only by committee proposals.

use crate::errors::ProtocolError;
use crate::fee_schedule::FeeSchedule;
use serde::{Deserialize, Serialize};

pub const MIN_BLOCK_INTERVAL: u8 = 1;
pub const MAX_BLOCK_INTERVAL: u8 = 30;
pub const MIN_TRANSACTION_SIZE_LIMIT: u32 = 1024;
pub const MIN_BLOCK_SIZE_LIMIT: u32 = MIN_TRANSACTION_SIZE_LIMIT * 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParameters {
    pub current_fees: FeeSchedule,
    /// Seconds between blocks.
    pub block_interval: u8,
    pub maximum_transaction_size: u32,
    pub maximum_block_size: u32,
    /// Seconds a transaction's expiration may lie beyond head block time.
    pub maximum_time_until_expiration: u32,
    pub maximum_proposal_lifetime: u32,
    /// Minimum review period of proposals the committee must approve.
    pub committee_proposal_review_period: u32,
    /// Upper bound on `num_auths()` of any authority set on an account.
    pub maximum_authority_membership: u16,
    /// Levels of nested account authorities walked during signature checks.
    pub max_authority_depth: u8,
    /// Highest predicate opcode an assert may use.
    pub max_predicate_opcode: u8,
    /// Upper bound on the packed size of an assert's predicates.
    pub max_predicate_size: u32,
}

impl Default for ChainParameters {
    fn default() -> Self {
        Self {
            current_fees: FeeSchedule::default(),
            block_interval: 5,
            maximum_transaction_size: 2048,
            maximum_block_size: 2 * 1024 * 1024,
            maximum_time_until_expiration: 60 * 60 * 24,
            maximum_proposal_lifetime: 60 * 60 * 24 * 28,
            committee_proposal_review_period: 60 * 60 * 24 * 14,
            maximum_authority_membership: 10,
            max_authority_depth: 2,
            max_predicate_opcode: 2,
            max_predicate_size: 1024,
        }
    }
}

impl ChainParameters {
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let invalid = |reason: String| Err(ProtocolError::InvalidParameters(reason));
        self.current_fees.validate()?;
        if !(MIN_BLOCK_INTERVAL..=MAX_BLOCK_INTERVAL).contains(&self.block_interval) {
            return invalid(format!("block_interval {} out of range", self.block_interval));
        }
        if self.maximum_transaction_size < MIN_TRANSACTION_SIZE_LIMIT {
            return invalid(format!(
                "maximum_transaction_size below {MIN_TRANSACTION_SIZE_LIMIT}"
            ));
        }
        if self.maximum_block_size < MIN_BLOCK_SIZE_LIMIT {
            return invalid(format!("maximum_block_size below {MIN_BLOCK_SIZE_LIMIT}"));
        }
        if self.maximum_transaction_size > self.maximum_block_size {
            return invalid("transactions may not exceed the block size".into());
        }
        if self.maximum_proposal_lifetime <= self.committee_proposal_review_period {
            return invalid("proposal lifetime must exceed the committee review period".into());
        }
        if self.maximum_authority_membership == 0 {
            return invalid("maximum_authority_membership must be positive".into());
        }
        Ok(())
    }
}
