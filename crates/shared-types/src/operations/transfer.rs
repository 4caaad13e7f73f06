//! Transfers between accounts.

use super::{calculate_data_fee, check, check_fee, OperationPayload, BLOCKCHAIN_PRECISION};
use crate::asset::Asset;
use crate::authority::RequiredAuthorities;
use crate::codec;
use crate::errors::ProtocolError;
use crate::ids::AccountId;
use crate::keys::PublicKey;
use serde::{Deserialize, Serialize};

/// Opaque message attached to a transfer or issue. Encryption happens in
/// the wallet; the ledger only prices its size.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    pub from: PublicKey,
    pub to: PublicKey,
    pub nonce: u64,
    pub message: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOperation {
    pub fee: Asset,
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Asset,
    pub memo: Option<Memo>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFeeParameters {
    pub fee: u64,
    pub price_per_kbyte: u64,
}

impl Default for TransferFeeParameters {
    fn default() -> Self {
        Self {
            fee: 20 * BLOCKCHAIN_PRECISION,
            price_per_kbyte: 10 * BLOCKCHAIN_PRECISION,
        }
    }
}

impl OperationPayload for TransferOperation {
    type FeeParameters = TransferFeeParameters;

    const NAME: &'static str = "transfer";

    fn fee(&self) -> Asset {
        self.fee
    }

    fn fee_mut(&mut self) -> &mut Asset {
        &mut self.fee
    }

    fn fee_payer(&self) -> AccountId {
        self.from
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        check_fee(&self.fee, Self::NAME)?;
        check(self.from != self.to, Self::NAME, "from != to")?;
        check(self.amount.amount > 0, Self::NAME, "amount must be positive")
    }

    fn calculate_fee(&self, params: &Self::FeeParameters) -> Result<u64, ProtocolError> {
        let mut fee = params.fee;
        if let Some(memo) = &self.memo {
            fee = fee.saturating_add(calculate_data_fee(
                codec::packed_size(memo)?,
                params.price_per_kbyte,
            ));
        }
        Ok(fee)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.insert(self.from);
    }
}
