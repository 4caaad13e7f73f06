//! Limit orders. Orders escrow the amount for sale until cancelled or
//! expired; there is no matching engine.

use super::{EvalContext, Evaluator};
use crate::database::Database;
use crate::domain::LimitOrderObject;
use crate::errors::ChainError;
use shared_types::{
    Asset, LimitOrderCancelOperation, LimitOrderCreateOperation, OperationResult, TypedId,
};

#[derive(Debug, Default)]
pub struct LimitOrderCreateEvaluator;

impl Evaluator for LimitOrderCreateEvaluator {
    type Operation = LimitOrderCreateOperation;

    fn evaluate(
        &mut self,
        ctx: &mut EvalContext<'_>,
        op: &LimitOrderCreateOperation,
    ) -> Result<(), ChainError> {
        ctx.account(op.seller)?;
        ctx.asset(op.amount_to_sell.asset_id)?;
        ctx.asset(op.min_to_receive.asset_id)?;
        let now = ctx.now()?;
        if op.expiration < now {
            return Err(ChainError::Rejected(format!(
                "order expiration {} is before head time {now}",
                op.expiration
            )));
        }
        ctx.debit(op.seller, op.amount_to_sell)
    }

    fn apply(
        &mut self,
        db: &mut Database,
        op: &LimitOrderCreateOperation,
    ) -> Result<OperationResult, ChainError> {
        db.debit(op.seller, op.amount_to_sell)?;
        let order = db.create::<LimitOrderObject>(|id| LimitOrderObject {
            id,
            seller: op.seller,
            for_sale: op.amount_to_sell.amount,
            sell_price: op.sell_price(),
            expiration: op.expiration,
        })?;
        Ok(OperationResult::ObjectId(order.id.object_id()))
    }
}

/// Removes an order and refunds what is left of it to the seller.
#[derive(Debug, Default)]
pub struct LimitOrderCancelEvaluator {
    refund: Option<Asset>,
}

impl Evaluator for LimitOrderCancelEvaluator {
    type Operation = LimitOrderCancelOperation;

    fn evaluate(
        &mut self,
        ctx: &mut EvalContext<'_>,
        op: &LimitOrderCancelOperation,
    ) -> Result<(), ChainError> {
        let order = ctx.limit_order(op.order)?;
        if order.seller != op.fee_paying_account {
            return Err(ChainError::Unauthorized {
                account: op.fee_paying_account,
                object: op.order.object_id(),
            });
        }
        let refund = order.amount_for_sale();
        ctx.state.effects.consume(op.order)?;
        ctx.credit(order.seller, refund)?;
        self.refund = Some(refund);
        Ok(())
    }

    fn apply(
        &mut self,
        db: &mut Database,
        op: &LimitOrderCancelOperation,
    ) -> Result<OperationResult, ChainError> {
        let order = db.remove::<LimitOrderObject>(op.order)?;
        let refund = self.refund.unwrap_or_else(|| order.amount_for_sale());
        db.credit(order.seller, refund)?;
        Ok(OperationResult::Asset(refund))
    }
}
