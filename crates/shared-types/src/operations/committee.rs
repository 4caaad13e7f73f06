//! Governance: replacing the chain parameters.

use super::{check_fee, OperationPayload, BLOCKCHAIN_PRECISION};
use crate::asset::Asset;
use crate::authority::RequiredAuthorities;
use crate::chain_parameters::ChainParameters;
use crate::errors::ProtocolError;
use crate::ids::{AccountId, COMMITTEE_ACCOUNT};
use serde::{Deserialize, Serialize};

/// Paid by the committee account and therefore only executable from an
/// approved proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeMemberUpdateGlobalParametersOperation {
    pub fee: Asset,
    pub new_parameters: ChainParameters,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeMemberUpdateGlobalParametersFeeParameters {
    pub fee: u64,
}

impl Default for CommitteeMemberUpdateGlobalParametersFeeParameters {
    fn default() -> Self {
        Self {
            fee: BLOCKCHAIN_PRECISION,
        }
    }
}

impl OperationPayload for CommitteeMemberUpdateGlobalParametersOperation {
    type FeeParameters = CommitteeMemberUpdateGlobalParametersFeeParameters;

    const NAME: &'static str = "committee_member_update_global_parameters";

    fn fee(&self) -> Asset {
        self.fee
    }

    fn fee_mut(&mut self) -> &mut Asset {
        &mut self.fee
    }

    fn fee_payer(&self) -> AccountId {
        COMMITTEE_ACCOUNT
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        check_fee(&self.fee, Self::NAME)?;
        self.new_parameters.validate()
    }

    fn calculate_fee(&self, params: &Self::FeeParameters) -> Result<u64, ProtocolError> {
        Ok(params.fee)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.insert(COMMITTEE_ACCOUNT);
    }
}
