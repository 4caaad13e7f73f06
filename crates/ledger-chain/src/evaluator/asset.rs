use super::{EvalContext, Evaluator};
use crate::database::{AssetDataDelta, Database};
use crate::domain::{AssetDynamicDataObject, AssetDynamicDataId, AssetObject};
use crate::errors::ChainError;
use shared_types::{
    Asset, AssetCreateOperation, AssetFundFeePoolOperation, AssetIssueOperation,
    AssetReserveOperation, OperationResult, ProtocolError, TypedId, CORE_ASSET,
};

#[derive(Debug, Default)]
pub struct AssetCreateEvaluator;

impl Evaluator for AssetCreateEvaluator {
    type Operation = AssetCreateOperation;

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>, op: &AssetCreateOperation) -> Result<(), ChainError> {
        ctx.account(op.issuer)?;
        if ctx.db.asset_by_symbol(&op.symbol).is_some() {
            return Err(ChainError::SymbolTaken(op.symbol.clone()));
        }
        // "A.B" may only be created by the issuer of "A"
        if let Some((prefix, _)) = op.symbol.rsplit_once('.') {
            let parent = ctx.db.asset_by_symbol(prefix).ok_or_else(|| {
                ChainError::Rejected(format!("parent asset {prefix} of {} does not exist", op.symbol))
            })?;
            if parent.issuer != op.issuer {
                return Err(ChainError::Unauthorized {
                    account: op.issuer,
                    object: parent.id.object_id(),
                });
            }
        }
        ctx.state.effects.claim_symbol(&op.symbol)
    }

    fn apply(&mut self, db: &mut Database, op: &AssetCreateOperation) -> Result<OperationResult, ChainError> {
        let asset_id = db.index::<AssetObject>()?.next_id();
        let data_id = db
            .create::<AssetDynamicDataObject>(|id| AssetDynamicDataObject {
                id,
                current_supply: 0,
                accumulated_fees: 0,
                fee_pool: 0,
            })?
            .id;
        let mut options = op.common_options.clone();
        options.core_exchange_rate.base.asset_id = asset_id;
        let asset = db.create::<AssetObject>(|id| AssetObject {
            id,
            symbol: op.symbol.clone(),
            precision: op.precision,
            issuer: op.issuer,
            options,
            dynamic_asset_data_id: data_id,
        })?;
        Ok(OperationResult::ObjectId(asset.id.object_id()))
    }
}

/// Mints new supply of a user asset to an account.
#[derive(Debug, Default)]
pub struct AssetIssueEvaluator {
    data_id: AssetDynamicDataId,
}

impl Evaluator for AssetIssueEvaluator {
    type Operation = AssetIssueOperation;

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>, op: &AssetIssueOperation) -> Result<(), ChainError> {
        let asset = ctx.asset(op.asset_to_issue.asset_id)?;
        if asset.issuer != op.issuer {
            return Err(ChainError::Unauthorized {
                account: op.issuer,
                object: asset.id.object_id(),
            });
        }
        ctx.account(op.issue_to_account)?;
        let supply = ctx
            .current_supply(asset)?
            .checked_add(op.asset_to_issue.amount)
            .ok_or(ProtocolError::Overflow("asset supply"))?;
        if supply > asset.options.max_supply {
            return Err(ChainError::MaxSupplyExceeded {
                asset: asset.id,
                amount: op.asset_to_issue.amount,
                max_supply: asset.options.max_supply,
            });
        }
        ctx.state.effects.adjust_supply(asset.id, op.asset_to_issue.amount)?;
        ctx.credit(op.issue_to_account, op.asset_to_issue)?;
        self.data_id = asset.dynamic_asset_data_id;
        Ok(())
    }

    fn apply(&mut self, db: &mut Database, op: &AssetIssueOperation) -> Result<OperationResult, ChainError> {
        db.adjust_asset_data(
            self.data_id,
            AssetDataDelta {
                supply: op.asset_to_issue.amount,
                ..AssetDataDelta::default()
            },
        )?;
        db.credit(op.issue_to_account, op.asset_to_issue)?;
        Ok(OperationResult::Void)
    }
}

/// Burns part of the payer's holding, lowering the supply.
#[derive(Debug, Default)]
pub struct AssetReserveEvaluator {
    data_id: AssetDynamicDataId,
}

impl Evaluator for AssetReserveEvaluator {
    type Operation = AssetReserveOperation;

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>, op: &AssetReserveOperation) -> Result<(), ChainError> {
        let asset = ctx.asset(op.amount_to_reserve.asset_id)?;
        ctx.debit(op.payer, op.amount_to_reserve)?;
        ctx.state
            .effects
            .adjust_supply(asset.id, -op.amount_to_reserve.amount)?;
        self.data_id = asset.dynamic_asset_data_id;
        Ok(())
    }

    fn apply(&mut self, db: &mut Database, op: &AssetReserveOperation) -> Result<OperationResult, ChainError> {
        db.debit(op.payer, op.amount_to_reserve)?;
        db.adjust_asset_data(
            self.data_id,
            AssetDataDelta {
                supply: -op.amount_to_reserve.amount,
                ..AssetDataDelta::default()
            },
        )?;
        Ok(OperationResult::Void)
    }
}

/// Moves core from an account into an asset's fee pool.
#[derive(Debug, Default)]
pub struct AssetFundFeePoolEvaluator {
    data_id: AssetDynamicDataId,
}

impl Evaluator for AssetFundFeePoolEvaluator {
    type Operation = AssetFundFeePoolOperation;

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>, op: &AssetFundFeePoolOperation) -> Result<(), ChainError> {
        let asset = ctx.asset(op.asset_id)?;
        ctx.debit(op.from_account, Asset::core(op.amount))?;
        ctx.state.effects.adjust_fee_pool(asset.id, op.amount)?;
        self.data_id = asset.dynamic_asset_data_id;
        Ok(())
    }

    fn apply(&mut self, db: &mut Database, op: &AssetFundFeePoolOperation) -> Result<OperationResult, ChainError> {
        db.debit(op.from_account, Asset::new(op.amount, CORE_ASSET))?;
        db.adjust_asset_data(
            self.data_id,
            AssetDataDelta {
                fee_pool: op.amount,
                ..AssetDataDelta::default()
            },
        )?;
        Ok(OperationResult::Void)
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{AssetDynamicDataObject, AssetObject};
    use crate::test_utils::*;
    use crate::ChainError;
    use shared_types::{
        Asset, AssetCreateOperation, AssetFundFeePoolOperation, AssetId, AssetReserveOperation,
        FeeSchedule, Operation, Price, TransferOperation,
    };

    fn create(chain: &TestChain, issuer: &str, symbol: &str) -> Operation {
        AssetCreateOperation {
            fee: core(0),
            issuer: chain.account(issuer),
            symbol: symbol.into(),
            precision: 2,
            common_options: asset_options(1_000),
        }
        .into()
    }

    fn supply(chain: &TestChain, asset: AssetId) -> i64 {
        let data_id = chain.db.get::<AssetObject>(asset).unwrap().dynamic_asset_data_id;
        chain.db.get::<AssetDynamicDataObject>(data_id).unwrap().current_supply
    }

    #[test]
    fn test_create_rewrites_exchange_rate_base() {
        let mut chain = TestChain::new();
        let usd = chain.create_asset("alice", "USD", asset_options(1_000));
        let asset = chain.db.get::<AssetObject>(usd).unwrap();
        assert_eq!(asset.core_exchange_rate().base.asset_id, usd);
        assert_eq!(chain.db.asset_by_symbol("USD").unwrap().id, usd);
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let mut chain = TestChain::new();
        chain.create_asset("alice", "USD", asset_options(1_000));
        let err = chain.push(&["bob"], vec![create(&chain, "bob", "USD")]).unwrap_err();
        assert!(matches!(err.root(), ChainError::SymbolTaken(_)));
    }

    #[test]
    fn test_sub_asset_requires_parent_issuer() {
        let mut chain = TestChain::new();
        chain.create_asset("alice", "USD", asset_options(1_000));
        let err = chain.push(&["bob"], vec![create(&chain, "bob", "USD.BOND")]).unwrap_err();
        assert!(matches!(err.root(), ChainError::Unauthorized { .. }));
        chain.push(&["alice"], vec![create(&chain, "alice", "USD.BOND")]).unwrap();
    }

    #[test]
    fn test_issue_up_to_max_supply() {
        let mut chain = TestChain::new();
        let bob = chain.account("bob");
        let usd = chain.create_asset("alice", "USD", asset_options(1_000));
        chain.issue("alice", usd, 1_000, bob);
        assert_eq!(supply(&chain, usd), 1_000);
        assert_eq!(chain.balance_of(bob, usd), 1_000);

        let err = chain.try_issue("alice", usd, 1, bob).unwrap_err();
        assert!(matches!(err.root(), ChainError::MaxSupplyExceeded { .. }));
    }

    #[test]
    fn test_only_issuer_issues() {
        let mut chain = TestChain::new();
        let bob = chain.account("bob");
        let usd = chain.create_asset("alice", "USD", asset_options(1_000));
        let err = chain.try_issue("bob", usd, 1, bob).unwrap_err();
        assert!(matches!(err.root(), ChainError::Unauthorized { .. }));
    }

    #[test]
    fn test_reserve_lowers_supply() {
        let mut chain = TestChain::new();
        let bob = chain.account("bob");
        let usd = chain.create_asset("alice", "USD", asset_options(1_000));
        chain.issue("alice", usd, 600, bob);
        let op = AssetReserveOperation {
            fee: core(0),
            payer: bob,
            amount_to_reserve: Asset::new(200, usd),
        };
        chain.push(&["bob"], vec![op.into()]).unwrap();
        assert_eq!(supply(&chain, usd), 400);
        assert_eq!(chain.balance_of(bob, usd), 400);
    }

    #[test]
    fn test_fee_paid_in_user_asset_draws_on_fee_pool() {
        let mut chain = TestChain::with_fees(FeeSchedule::default());
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        let mut options = asset_options(1_000_000_000);
        // 1 USD buys 10 core
        options.core_exchange_rate = Price::new(Asset::new(1, AssetId(1)), core(10));
        let usd = chain.create_asset("alice", "USD", options);
        chain.issue("alice", usd, 100_000_000, bob);
        let fund = AssetFundFeePoolOperation {
            fee: core(0),
            from_account: alice,
            asset_id: usd,
            amount: 5_000_000,
        };
        chain.push_with_fees(&["alice"], vec![fund.into()]).unwrap();

        let mut transfer: Operation = TransferOperation {
            fee: Asset::new(0, usd),
            from: bob,
            to: alice,
            amount: Asset::new(10, usd),
            memo: None,
        }
        .into();
        let fee = chain.set_fee(&mut transfer, usd);
        assert_eq!(fee.asset_id, usd);
        let core_pool_before = chain.db.get::<AssetDynamicDataObject>(chain.asset_data(usd)).unwrap().fee_pool;
        chain.push(&["bob"], vec![transfer]).unwrap();

        let data = chain.db.get::<AssetDynamicDataObject>(chain.asset_data(usd)).unwrap();
        assert_eq!(data.accumulated_fees, fee.amount);
        assert_eq!(data.fee_pool, core_pool_before - fee.amount * 10);
    }

    #[test]
    fn test_empty_fee_pool_rejects_user_asset_fee() {
        let mut chain = TestChain::with_fees(FeeSchedule::default());
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        let mut options = asset_options(1_000_000_000);
        options.core_exchange_rate = Price::new(Asset::new(1, AssetId(1)), core(10));
        let usd = chain.create_asset("alice", "USD", options);
        chain.issue("alice", usd, 100_000_000, bob);
        let mut transfer: Operation = TransferOperation {
            fee: Asset::new(0, usd),
            from: bob,
            to: alice,
            amount: Asset::new(10, usd),
            memo: None,
        }
        .into();
        chain.set_fee(&mut transfer, usd);
        let err = chain.push(&["bob"], vec![transfer]).unwrap_err();
        assert!(matches!(err.root(), ChainError::InsufficientFeePool { .. }));
    }
}
