//! Proposed transactions: creation, approval changes and deletion.

use super::{calculate_data_fee, check, check_fee, Operation, OperationPayload, BLOCKCHAIN_PRECISION};
use crate::asset::Asset;
use crate::authority::{Authority, RequiredAuthorities};
use crate::codec;
use crate::errors::ProtocolError;
use crate::ids::{AccountId, ProposalId};
use crate::keys::PublicKey;
use crate::time::TimePointSec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalCreateOperation {
    pub fee: Asset,
    pub fee_paying_account: AccountId,
    pub expiration_time: TimePointSec,
    pub proposed_ops: Vec<Operation>,
    /// Seconds before expiration during which approvals may no longer be
    /// added; required for proposals the committee must approve.
    pub review_period_seconds: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalCreateFeeParameters {
    pub fee: u64,
    pub price_per_kbyte: u64,
}

impl Default for ProposalCreateFeeParameters {
    fn default() -> Self {
        Self {
            fee: 20 * BLOCKCHAIN_PRECISION,
            price_per_kbyte: 10 * BLOCKCHAIN_PRECISION,
        }
    }
}

impl OperationPayload for ProposalCreateOperation {
    type FeeParameters = ProposalCreateFeeParameters;

    const NAME: &'static str = "proposal_create";

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
        check(!self.proposed_ops.is_empty(), Self::NAME, "no proposed operations")?;
        self.proposed_ops.iter().try_for_each(Operation::validate)
    }

    fn calculate_fee(&self, params: &Self::FeeParameters) -> Result<u64, ProtocolError> {
        let data = calculate_data_fee(codec::packed_size(&self.proposed_ops)?, params.price_per_kbyte);
        Ok(params.fee.saturating_add(data))
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.insert(self.fee_paying_account);
    }
}

/// Adds or removes approvals on a pending proposal. Every approval change
/// must itself be authorised by the approving party.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalUpdateOperation {
    pub fee: Asset,
    pub fee_paying_account: AccountId,
    pub proposal: ProposalId,
    pub active_approvals_to_add: BTreeSet<AccountId>,
    pub active_approvals_to_remove: BTreeSet<AccountId>,
    pub owner_approvals_to_add: BTreeSet<AccountId>,
    pub owner_approvals_to_remove: BTreeSet<AccountId>,
    pub key_approvals_to_add: BTreeSet<PublicKey>,
    pub key_approvals_to_remove: BTreeSet<PublicKey>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalUpdateFeeParameters {
    pub fee: u64,
    pub price_per_kbyte: u64,
}

impl Default for ProposalUpdateFeeParameters {
    fn default() -> Self {
        Self {
            fee: 20 * BLOCKCHAIN_PRECISION,
            price_per_kbyte: 10 * BLOCKCHAIN_PRECISION,
        }
    }
}

impl OperationPayload for ProposalUpdateOperation {
    type FeeParameters = ProposalUpdateFeeParameters;

    const NAME: &'static str = "proposal_update";

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
        check(
            !(self.active_approvals_to_add.is_empty()
                && self.active_approvals_to_remove.is_empty()
                && self.owner_approvals_to_add.is_empty()
                && self.owner_approvals_to_remove.is_empty()
                && self.key_approvals_to_add.is_empty()
                && self.key_approvals_to_remove.is_empty()),
            Self::NAME,
            "no approval changes",
        )?;
        check(
            self.active_approvals_to_add.is_disjoint(&self.active_approvals_to_remove),
            Self::NAME,
            "active approval both added and removed",
        )?;
        check(
            self.owner_approvals_to_add.is_disjoint(&self.owner_approvals_to_remove),
            Self::NAME,
            "owner approval both added and removed",
        )?;
        check(
            self.key_approvals_to_add.is_disjoint(&self.key_approvals_to_remove),
            Self::NAME,
            "key approval both added and removed",
        )
    }

    fn calculate_fee(&self, params: &Self::FeeParameters) -> Result<u64, ProtocolError> {
        let data = calculate_data_fee(codec::packed_size(self)?, params.price_per_kbyte);
        Ok(params.fee.saturating_add(data))
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.insert(self.fee_paying_account);
        auths.active.extend(self.active_approvals_to_add.iter().copied());
        auths.active.extend(self.active_approvals_to_remove.iter().copied());
        auths.owner.extend(self.owner_approvals_to_add.iter().copied());
        auths.owner.extend(self.owner_approvals_to_remove.iter().copied());
        auths.other.extend(
            self.key_approvals_to_add
                .iter()
                .chain(self.key_approvals_to_remove.iter())
                .map(|key| Authority::single_key(*key)),
        );
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDeleteOperation {
    pub fee: Asset,
    pub fee_paying_account: AccountId,
    pub using_owner_authority: bool,
    pub proposal: ProposalId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDeleteFeeParameters {
    pub fee: u64,
}

impl Default for ProposalDeleteFeeParameters {
    fn default() -> Self {
        Self {
            fee: BLOCKCHAIN_PRECISION,
        }
    }
}

impl OperationPayload for ProposalDeleteOperation {
    type FeeParameters = ProposalDeleteFeeParameters;

    const NAME: &'static str = "proposal_delete";

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
        check_fee(&self.fee, Self::NAME)
    }

    fn calculate_fee(&self, params: &Self::FeeParameters) -> Result<u64, ProtocolError> {
        Ok(params.fee)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        if self.using_owner_authority {
            auths.owner.insert(self.fee_paying_account);
        } else {
            auths.active.insert(self.fee_paying_account);
        }
    }
}
