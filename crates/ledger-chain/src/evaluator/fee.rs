//! Fee handling shared by every operation.
//!
//! A fee paid in a non-core asset is converted at the asset's core
//! exchange rate and the core equivalent is drawn from that asset's fee
//! pool; the paid asset itself accumulates on the asset.

use super::EvalContext;
use crate::database::{AssetDataDelta, Database};
use crate::domain::AssetObject;
use crate::errors::ChainError;
use shared_types::{AccountId, Asset, Operation, Price, ShareType, CORE_ASSET};

/// Fee of one operation as settled during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreparedFee {
    pub payer: AccountId,
    pub fee: Asset,
    /// Core value of `fee`; equals `fee.amount` for a core fee.
    pub core_fee: ShareType,
}

/// Checks the fee of `op` and books it against the payer's balance.
///
/// Inside a proposal the declared fee is charged as is, without comparing
/// it to the schedule.
pub fn prepare_fee(ctx: &mut EvalContext<'_>, op: &Operation) -> Result<PreparedFee, ChainError> {
    let fee = op.fee();
    let payer = op.fee_payer();
    if fee.amount < 0 {
        return Err(ChainError::Rejected(format!("negative fee {fee}")));
    }
    ctx.account(payer)?;
    let asset = ctx.asset(fee.asset_id)?;
    let rate = if fee.asset_id == CORE_ASSET {
        Price::unit_price(CORE_ASSET)
    } else {
        *asset.core_exchange_rate()
    };

    if !ctx.state.is_proposed_trx {
        let required = ctx.parameters()?.current_fees.calculate_fee(op, &rate)?;
        if fee.amount < required.amount {
            return Err(ChainError::InsufficientFee {
                paid: fee,
                required,
            });
        }
    }

    let core_fee = if fee.asset_id == CORE_ASSET {
        fee.amount
    } else {
        rate.convert(&fee)?.amount
    };
    ctx.debit(payer, fee)?;

    if fee.asset_id != CORE_ASSET {
        let pool = ctx.fee_pool(asset)?;
        if pool < core_fee {
            return Err(ChainError::InsufficientFeePool {
                asset: asset.id,
                pool,
                required: core_fee,
            });
        }
        ctx.state.effects.adjust_fee_pool(asset.id, -core_fee)?;
    }

    Ok(PreparedFee {
        payer,
        fee,
        core_fee,
    })
}

/// Moves a prepared fee out of the payer's balance.
pub fn pay_fee(db: &mut Database, prepared: &PreparedFee) -> Result<(), ChainError> {
    if prepared.fee.amount == 0 {
        return Ok(());
    }
    db.debit(prepared.payer, prepared.fee)?;

    if prepared.fee.asset_id != CORE_ASSET {
        let data_id = db.get::<AssetObject>(prepared.fee.asset_id)?.dynamic_asset_data_id;
        db.adjust_asset_data(
            data_id,
            AssetDataDelta {
                accumulated_fees: prepared.fee.amount,
                fee_pool: -prepared.core_fee,
                ..AssetDataDelta::default()
            },
        )?;
    }

    let core_data = db.get::<AssetObject>(CORE_ASSET)?.dynamic_asset_data_id;
    db.adjust_asset_data(
        core_data,
        AssetDataDelta {
            accumulated_fees: prepared.core_fee,
            ..AssetDataDelta::default()
        },
    )
}
