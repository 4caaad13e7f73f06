use super::{EvalContext, Evaluator};
use crate::database::Database;
use crate::domain::AccountObject;
use crate::errors::ChainError;
use shared_types::{
    AccountCreateOperation, AccountUpdateOperation, Authority, OperationResult, TypedId,
};

/// Size limit and referenced accounts of an authority about to be stored.
fn check_authority(ctx: &EvalContext<'_>, authority: &Authority) -> Result<(), ChainError> {
    let limit = ctx.parameters()?.maximum_authority_membership;
    let members = authority.num_auths();
    if members > usize::from(limit) {
        return Err(ChainError::AuthorityTooLarge { members, limit });
    }
    for account in authority.account_auths.keys() {
        ctx.account(*account)?;
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct AccountCreateEvaluator;

impl Evaluator for AccountCreateEvaluator {
    type Operation = AccountCreateOperation;

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>, op: &AccountCreateOperation) -> Result<(), ChainError> {
        ctx.account(op.registrar)?;
        check_authority(ctx, &op.owner)?;
        check_authority(ctx, &op.active)?;
        if ctx.db.account_by_name(&op.name).is_some() {
            return Err(ChainError::NameTaken(op.name.clone()));
        }
        ctx.state.effects.claim_name(&op.name)
    }

    fn apply(&mut self, db: &mut Database, op: &AccountCreateOperation) -> Result<OperationResult, ChainError> {
        let account = db.create::<AccountObject>(|id| AccountObject {
            id,
            registrar: op.registrar,
            name: op.name.clone(),
            owner: op.owner.clone(),
            active: op.active.clone(),
            memo_key: op.memo_key,
        })?;
        Ok(OperationResult::ObjectId(account.id.object_id()))
    }
}

#[derive(Debug, Default)]
pub struct AccountUpdateEvaluator;

impl Evaluator for AccountUpdateEvaluator {
    type Operation = AccountUpdateOperation;

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>, op: &AccountUpdateOperation) -> Result<(), ChainError> {
        ctx.account(op.account)?;
        if let Some(owner) = &op.owner {
            check_authority(ctx, owner)?;
        }
        if let Some(active) = &op.active {
            check_authority(ctx, active)?;
        }
        Ok(())
    }

    fn apply(&mut self, db: &mut Database, op: &AccountUpdateOperation) -> Result<OperationResult, ChainError> {
        db.modify::<AccountObject>(op.account, |account| {
            if let Some(owner) = &op.owner {
                account.owner = owner.clone();
            }
            if let Some(active) = &op.active {
                account.active = active.clone();
            }
            if let Some(memo_key) = op.new_memo_key {
                account.memo_key = memo_key;
            }
        })?;
        Ok(OperationResult::Void)
    }
}
