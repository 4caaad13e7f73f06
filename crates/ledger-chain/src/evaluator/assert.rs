use super::{EvalContext, Evaluator};
use crate::database::Database;
use crate::domain::{block_summary_id, AccountObject, AssetObject, BlockSummaryObject, SkipFlags};
use crate::errors::ChainError;
use shared_types::{codec, AssertOperation, OperationResult, Predicate};

/// Makes a transaction conditional on ledger state.
#[derive(Debug, Default)]
pub struct AssertEvaluator;

impl Evaluator for AssertEvaluator {
    type Operation = AssertOperation;

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>, op: &AssertOperation) -> Result<(), ChainError> {
        if ctx.state.skip.contains(SkipFlags::SKIP_ASSERT_EVALUATION) {
            return Ok(());
        }
        let params = ctx.parameters()?;
        for (index, predicate) in op.predicates.iter().enumerate() {
            let opcode = predicate.opcode();
            if opcode > params.max_predicate_opcode {
                return Err(ChainError::UnknownPredicate {
                    opcode,
                    max: params.max_predicate_opcode,
                });
            }
            let size = codec::packed_size(predicate)?;
            if size > u64::from(params.max_predicate_size) {
                return Err(ChainError::PredicateTooLarge {
                    size,
                    limit: params.max_predicate_size,
                });
            }
            check_predicate(ctx.db, predicate)
                .map_err(|reason| ChainError::PredicateFailed { index, reason })?;
        }
        Ok(())
    }

    fn apply(&mut self, _db: &mut Database, _op: &AssertOperation) -> Result<OperationResult, ChainError> {
        Ok(OperationResult::Void)
    }
}

fn check_predicate(db: &Database, predicate: &Predicate) -> Result<(), String> {
    match predicate {
        Predicate::AccountNameEqLit { account_id, name } => {
            let account = db
                .find::<AccountObject>(*account_id)
                .ok_or_else(|| format!("account {account_id} does not exist"))?;
            if account.name != *name {
                return Err(format!("account {account_id} is named {}, not {name}", account.name));
            }
            Ok(())
        }
        Predicate::AssetSymbolEqLit { asset_id, symbol } => {
            let asset = db
                .find::<AssetObject>(*asset_id)
                .ok_or_else(|| format!("asset {asset_id} does not exist"))?;
            if asset.symbol != *symbol {
                return Err(format!("asset {asset_id} is {}, not {symbol}", asset.symbol));
            }
            Ok(())
        }
        Predicate::BlockId { id } => {
            let known = db
                .find::<BlockSummaryObject>(block_summary_id(id.block_num()))
                .is_some_and(|summary| summary.block_id == *id);
            if known {
                Ok(())
            } else {
                Err(format!("block {id} is not in the recent history"))
            }
        }
    }
}
