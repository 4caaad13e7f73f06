//! Assertions over ledger state that make a transaction conditional.

use super::{check, check_fee, OperationPayload, BLOCKCHAIN_PRECISION};
use crate::asset::Asset;
use crate::authority::RequiredAuthorities;
use crate::block::BlockId;
use crate::errors::ProtocolError;
use crate::ids::{AccountId, AssetId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A condition evaluated against the ledger when the assert is evaluated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// The account's name equals `name`.
    AccountNameEqLit { account_id: AccountId, name: String },
    /// The asset's symbol equals `symbol`.
    AssetSymbolEqLit { asset_id: AssetId, symbol: String },
    /// `id` is in the recent block history (within the TaPoS window).
    BlockId { id: BlockId },
}

impl Predicate {
    /// Position in the predicate set; compared against `max_predicate_opcode`.
    pub fn opcode(&self) -> u8 {
        match self {
            Predicate::AccountNameEqLit { .. } => 0,
            Predicate::AssetSymbolEqLit { .. } => 1,
            Predicate::BlockId { .. } => 2,
        }
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Predicate::AccountNameEqLit { name, .. } => {
                check(!name.is_empty(), AssertOperation::NAME, "empty account name predicate")
            }
            Predicate::AssetSymbolEqLit { symbol, .. } => {
                check(!symbol.is_empty(), AssertOperation::NAME, "empty asset symbol predicate")
            }
            Predicate::BlockId { .. } => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertOperation {
    pub fee: Asset,
    pub fee_paying_account: AccountId,
    pub predicates: Vec<Predicate>,
    pub required_auths: BTreeSet<AccountId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertFeeParameters {
    /// Charged once per predicate.
    pub fee: u64,
}

impl Default for AssertFeeParameters {
    fn default() -> Self {
        Self {
            fee: BLOCKCHAIN_PRECISION,
        }
    }
}

impl OperationPayload for AssertOperation {
    type FeeParameters = AssertFeeParameters;

    const NAME: &'static str = "assert";

    fn fee(&self) -> Asset {
        self.fee
    }

    fn fee_mut(&mut self) -> &mut Asset {
        &mut self.fee
    }

    fn fee_payer(&self) -> AccountId {
        self.fee_paying_account
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        check_fee(&self.fee, Self::NAME)?;
        check(!self.predicates.is_empty(), Self::NAME, "no predicates")?;
        self.predicates.iter().try_for_each(Predicate::validate)
    }

    fn calculate_fee(&self, params: &Self::FeeParameters) -> Result<u64, ProtocolError> {
        let count = self.predicates.len().max(1) as u64;
        Ok(params.fee.saturating_mul(count))
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.insert(self.fee_paying_account);
        auths.active.extend(self.required_auths.iter().copied());
    }
}
