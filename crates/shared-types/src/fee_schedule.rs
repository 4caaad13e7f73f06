//! # Fee Schedule
//!
//! Maps every operation to its fee parameters and turns an operation into
//! the fee it owes, in the asset the payer chose.
//!
//! Some operations are priced by their own packed size, which includes the
//! fee field. Because packing uses variable-length integers, writing the fee
//! can change the size and therefore the fee. [`FeeSchedule::set_fee`]
//! iterates until the value is stable, keeping the largest fee seen.

use crate::asset::{Asset, Price, MAX_SHARE_SUPPLY, PERCENT_100};
use crate::errors::ProtocolError;
use crate::operations::{FeeParameters, Operation, OperationTag};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Upper bound on fee recomputations in [`FeeSchedule::set_fee`].
pub const MAX_FEE_STABILIZATION_ITERATION: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub parameters: Vec<FeeParameters>,
    /// Multiplier in basis points applied to every base fee.
    pub scale: u32,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            parameters: OperationTag::ALL
                .iter()
                .map(|tag| FeeParameters::default_for(*tag))
                .collect(),
            scale: PERCENT_100,
        }
    }
}

impl FeeSchedule {
    /// Default parameters with every fee scaled to zero.
    pub fn free() -> Self {
        Self {
            scale: 0,
            ..Self::default()
        }
    }

    pub fn parameters_for(&self, tag: OperationTag) -> Option<&FeeParameters> {
        self.parameters.iter().find(|p| p.tag() == tag)
    }

    /// Replaces the parameters of the operation `params` belongs to.
    pub fn set_parameters(&mut self, params: FeeParameters) {
        let tag = params.tag();
        match self.parameters.iter_mut().find(|p| p.tag() == tag) {
            Some(slot) => *slot = params,
            None => self.parameters.push(params),
        }
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        let mut seen = [false; 256];
        for params in &self.parameters {
            let index = params.tag().index();
            if seen[index] {
                return Err(ProtocolError::DuplicateFeeParameters(params.tag().name()));
            }
            seen[index] = true;
        }
        Ok(())
    }

    /// Fee owed by `op`, converted through `core_exchange_rate` into the
    /// asset on the non-core side of the rate.
    pub fn calculate_fee(&self, op: &Operation, core_exchange_rate: &Price) -> Result<Asset, ProtocolError> {
        let base = op.calculate_fee(self.parameters_for(op.tag()))?;
        let scaled = u128::from(base) * u128::from(self.scale) / u128::from(PERCENT_100);
        if scaled > MAX_SHARE_SUPPLY as u128 {
            return Err(ProtocolError::FeeOverflow { fee: scaled });
        }
        core_exchange_rate.multiply_and_round_up(&Asset::core(scaled as i64))
    }

    /// Writes the required fee into `op` and returns it.
    pub fn set_fee(&self, op: &mut Operation, core_exchange_rate: &Price) -> Result<Asset, ProtocolError> {
        let mut fee = self.calculate_fee(op, core_exchange_rate)?;
        let mut fee_max = fee;
        for iteration in 0..MAX_FEE_STABILIZATION_ITERATION {
            *op.fee_mut() = fee_max;
            let recomputed = self.calculate_fee(op, core_exchange_rate)?;
            if recomputed == fee {
                break;
            }
            if iteration == 0 {
                warn!(
                    op = op.name(),
                    first = fee.amount,
                    recomputed = recomputed.amount,
                    "fee did not stabilise on the first pass"
                );
            }
            if recomputed.amount > fee_max.amount {
                fee_max = recomputed;
            }
            fee = recomputed;
        }
        *op.fee_mut() = fee_max;
        Ok(fee_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{AccountId, AssetId, CORE_ASSET};
    use crate::keys::PublicKey;
    use crate::authority::Authority;
    use crate::operations::{
        AccountCreateFeeParameters, AccountCreateOperation, Memo, TransferFeeParameters,
        TransferOperation,
    };
    use proptest::prelude::*;

    fn transfer_with_memo(len: usize) -> Operation {
        TransferOperation {
            fee: Asset::core(0),
            from: AccountId(5),
            to: AccountId(6),
            amount: Asset::core(100),
            memo: Some(Memo {
                from: PublicKey([1; 32]),
                to: PublicKey([2; 32]),
                nonce: 0,
                message: vec![7; len],
            }),
        }
        .into()
    }

    #[test]
    fn test_default_schedule_covers_every_operation() {
        let schedule = FeeSchedule::default();
        assert!(schedule.validate().is_ok());
        for tag in OperationTag::ALL {
            assert!(schedule.parameters_for(*tag).is_some());
        }
    }

    #[test]
    fn test_duplicate_parameters_rejected() {
        let mut schedule = FeeSchedule::default();
        schedule.parameters.push(FeeParameters::default_for(OperationTag::Transfer));
        assert!(matches!(
            schedule.validate(),
            Err(ProtocolError::DuplicateFeeParameters("transfer"))
        ));
    }

    #[test]
    fn test_scale_applies() {
        let mut schedule = FeeSchedule::default();
        schedule.set_parameters(
            TransferFeeParameters {
                fee: 1000,
                price_per_kbyte: 0,
            }
            .into(),
        );
        let op = transfer_with_memo(0);
        let cer = Price::unit_price(CORE_ASSET);
        assert_eq!(schedule.calculate_fee(&op, &cer).unwrap(), Asset::core(1000));
        schedule.scale = PERCENT_100 / 2;
        assert_eq!(schedule.calculate_fee(&op, &cer).unwrap(), Asset::core(500));
        assert_eq!(FeeSchedule::free().calculate_fee(&op, &cer).unwrap(), Asset::core(0));
    }

    #[test]
    fn test_fee_converted_to_payment_asset() {
        let mut schedule = FeeSchedule::default();
        schedule.set_parameters(
            TransferFeeParameters {
                fee: 1001,
                price_per_kbyte: 0,
            }
            .into(),
        );
        // 1 USD is worth 10 CORE
        let usd = AssetId(1);
        let cer = Price::new(Asset::new(1, usd), Asset::core(10));
        let fee = schedule.calculate_fee(&transfer_with_memo(0), &cer).unwrap();
        assert_eq!(fee, Asset::new(101, usd));
    }

    #[test]
    fn test_overflow_guard() {
        let mut schedule = FeeSchedule::default();
        schedule.set_parameters(
            TransferFeeParameters {
                fee: u64::MAX,
                price_per_kbyte: 0,
            }
            .into(),
        );
        assert!(matches!(
            schedule.calculate_fee(&transfer_with_memo(0), &Price::unit_price(CORE_ASSET)),
            Err(ProtocolError::FeeOverflow { .. })
        ));
    }

    #[test]
    fn test_set_fee_writes_stable_fee() {
        let schedule = FeeSchedule::default();
        let cer = Price::unit_price(CORE_ASSET);
        let mut op = transfer_with_memo(300);
        let fee = schedule.set_fee(&mut op, &cer).unwrap();
        assert_eq!(op.fee(), fee);
        assert!(schedule.calculate_fee(&op, &cer).unwrap().amount <= fee.amount);
    }

    fn account_create(name_len: usize) -> Operation {
        let key = PublicKey([3; 32]);
        AccountCreateOperation {
            fee: Asset::core(0),
            registrar: AccountId(5),
            name: "b".repeat(name_len),
            owner: Authority::single_key(key),
            active: Authority::single_key(key),
            memo_key: key,
        }
        .into()
    }

    proptest! {
        #[test]
        fn prop_set_fee_converges_for_size_priced_ops(len in 3usize..2048, per_kb in 0u64..50_000_000_000) {
            let mut schedule = FeeSchedule::default();
            schedule.set_parameters(AccountCreateFeeParameters {
                basic_fee: 1,
                premium_fee: 1,
                price_per_kbyte: per_kb,
            }.into());
            let cer = Price::unit_price(CORE_ASSET);
            let mut op = account_create(len);
            let fee = schedule.set_fee(&mut op, &cer).unwrap();
            prop_assert_eq!(op.fee(), fee);
            // the op as written never owes more than the fee it carries
            prop_assert!(schedule.calculate_fee(&op, &cer).unwrap().amount <= fee.amount);
        }
    }
}
