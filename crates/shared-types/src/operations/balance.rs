//! Claiming balances imported at genesis.

use super::{check, check_fee, OperationPayload};
use crate::asset::Asset;
use crate::authority::{Authority, RequiredAuthorities};
use crate::errors::ProtocolError;
use crate::ids::{AccountId, BalanceId};
use crate::keys::PublicKey;
use serde::{Deserialize, Serialize};

/// Moves a claimable balance into `deposit_to_account`. Authorised by the
/// key that owns the balance, not by an account; carries no fee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceClaimOperation {
    pub fee: Asset,
    pub deposit_to_account: AccountId,
    pub balance_to_claim: BalanceId,
    pub balance_owner_key: PublicKey,
    pub total_claimed: Asset,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceClaimFeeParameters {}

impl OperationPayload for BalanceClaimOperation {
    type FeeParameters = BalanceClaimFeeParameters;

    const NAME: &'static str = "balance_claim";

    fn fee(&self) -> Asset {
        self.fee
    }

    fn fee_mut(&mut self) -> &mut Asset {
        &mut self.fee
    }

    fn fee_payer(&self) -> AccountId {
        self.deposit_to_account
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        check_fee(&self.fee, Self::NAME)?;
        check(self.fee.amount == 0, Self::NAME, "balance claims carry no fee")?;
        check(self.total_claimed.amount >= 0, Self::NAME, "claim must be non-negative")
    }

    fn calculate_fee(&self, _params: &Self::FeeParameters) -> Result<u64, ProtocolError> {
        Ok(0)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.other.push(Authority::single_key(self.balance_owner_key));
    }
}
