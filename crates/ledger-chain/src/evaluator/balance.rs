//! Claims of genesis balances owned by a key rather than an account.

use super::{EvalContext, Evaluator};
use crate::database::Database;
use crate::domain::BalanceObject;
use crate::errors::ChainError;
use shared_types::{BalanceClaimOperation, OperationResult, ProtocolError, ShareType};

/// Seconds that must pass between two claims of a vesting balance.
pub const VESTING_CLAIM_INTERVAL: u32 = 60 * 60 * 24;

#[derive(Debug, Default)]
pub struct BalanceClaimEvaluator {
    /// What stays in the balance object; zero removes it.
    remaining: ShareType,
}

impl Evaluator for BalanceClaimEvaluator {
    type Operation = BalanceClaimOperation;

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>, op: &BalanceClaimOperation) -> Result<(), ChainError> {
        let balance = ctx.balance_object(op.balance_to_claim)?;
        if op.balance_owner_key != balance.owner {
            return Err(ChainError::InvalidBalanceClaim(format!(
                "{} is not owned by key {}",
                balance.id, op.balance_owner_key
            )));
        }
        if op.total_claimed.asset_id != balance.balance.asset_id {
            return Err(ChainError::InvalidBalanceClaim(format!(
                "{} holds {}, not {}",
                balance.id, balance.balance.asset_id, op.total_claimed.asset_id
            )));
        }
        ctx.account(op.deposit_to_account)?;

        let now = ctx.now()?;
        if balance.is_vesting() {
            let available = balance.available(now);
            if op.total_claimed.amount > available {
                return Err(ChainError::InvalidBalanceClaim(format!(
                    "claimed {} but only {available} has vested",
                    op.total_claimed.amount
                )));
            }
            if now.seconds_since(balance.last_claim_date) < VESTING_CLAIM_INTERVAL {
                return Err(ChainError::InvalidBalanceClaim(
                    "vesting balance was claimed less than a day ago".into(),
                ));
            }
        } else if op.total_claimed != balance.balance {
            return Err(ChainError::InvalidBalanceClaim(format!(
                "claimed {} of {}; total_claimed must equal full balance",
                op.total_claimed, balance.balance
            )));
        }

        self.remaining = balance
            .balance
            .amount
            .checked_sub(op.total_claimed.amount)
            .ok_or(ProtocolError::Overflow("balance claim"))?;
        ctx.state.effects.consume(op.balance_to_claim)?;
        ctx.credit(op.deposit_to_account, op.total_claimed)
    }

    fn apply(&mut self, db: &mut Database, op: &BalanceClaimOperation) -> Result<OperationResult, ChainError> {
        if self.remaining == 0 {
            db.remove::<BalanceObject>(op.balance_to_claim)?;
        } else {
            let now = db.head_block_time()?;
            let remaining = self.remaining;
            db.modify::<BalanceObject>(op.balance_to_claim, |balance| {
                balance.balance.amount = remaining;
                balance.last_claim_date = now;
            })?;
        }
        db.credit(op.deposit_to_account, op.total_claimed)?;
        Ok(OperationResult::Asset(op.total_claimed))
    }
}
