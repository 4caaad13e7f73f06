//! Limit order placement and cancellation.

use super::{check, check_fee, OperationPayload, BLOCKCHAIN_PRECISION};
use crate::asset::{Asset, Price};
use crate::authority::RequiredAuthorities;
use crate::errors::ProtocolError;
use crate::ids::{AccountId, LimitOrderId};
use crate::time::TimePointSec;
use serde::{Deserialize, Serialize};

/// Offers `amount_to_sell` for at least `min_to_receive` until `expiration`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrderCreateOperation {
    pub fee: Asset,
    pub seller: AccountId,
    pub amount_to_sell: Asset,
    pub min_to_receive: Asset,
    pub expiration: TimePointSec,
}

impl LimitOrderCreateOperation {
    pub fn sell_price(&self) -> Price {
        Price::new(self.amount_to_sell, self.min_to_receive)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrderCreateFeeParameters {
    pub fee: u64,
}

impl Default for LimitOrderCreateFeeParameters {
    fn default() -> Self {
        Self {
            fee: 5 * BLOCKCHAIN_PRECISION,
        }
    }
}

impl OperationPayload for LimitOrderCreateOperation {
    type FeeParameters = LimitOrderCreateFeeParameters;

    const NAME: &'static str = "limit_order_create";

    fn fee(&self) -> Asset {
        self.fee
    }

    fn fee_mut(&mut self) -> &mut Asset {
        &mut self.fee
    }

    fn fee_payer(&self) -> AccountId {
        self.seller
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        check_fee(&self.fee, Self::NAME)?;
        check(
            self.amount_to_sell.asset_id != self.min_to_receive.asset_id,
            Self::NAME,
            "cannot trade an asset for itself",
        )?;
        check(self.amount_to_sell.amount > 0, Self::NAME, "amount_to_sell must be positive")?;
        check(self.min_to_receive.amount > 0, Self::NAME, "min_to_receive must be positive")
    }

    fn calculate_fee(&self, params: &Self::FeeParameters) -> Result<u64, ProtocolError> {
        Ok(params.fee)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.insert(self.seller);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrderCancelOperation {
    pub fee: Asset,
    pub fee_paying_account: AccountId,
    pub order: LimitOrderId,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrderCancelFeeParameters {
    pub fee: u64,
}

impl OperationPayload for LimitOrderCancelOperation {
    type FeeParameters = LimitOrderCancelFeeParameters;

    const NAME: &'static str = "limit_order_cancel";

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
        auths.active.insert(self.fee_paying_account);
    }
}
