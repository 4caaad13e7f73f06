use super::{EvalContext, Evaluator};
use crate::database::Database;
use crate::errors::ChainError;
use shared_types::{OperationResult, TransferOperation};

/// Moves an amount between two accounts.
#[derive(Debug, Default)]
pub struct TransferEvaluator;

impl Evaluator for TransferEvaluator {
    type Operation = TransferOperation;

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>, op: &TransferOperation) -> Result<(), ChainError> {
        ctx.account(op.from)?;
        ctx.account(op.to)?;
        let asset = ctx.asset(op.amount.asset_id)?;
        // a restricted asset only moves to or from its issuer
        if asset.is_transfer_restricted() && op.from != asset.issuer && op.to != asset.issuer {
            return Err(ChainError::TransferRestricted(asset.id));
        }
        ctx.debit(op.from, op.amount)?;
        ctx.credit(op.to, op.amount)
    }

    fn apply(&mut self, db: &mut Database, op: &TransferOperation) -> Result<OperationResult, ChainError> {
        db.debit(op.from, op.amount)?;
        db.credit(op.to, op.amount)?;
        Ok(OperationResult::Void)
    }
}
