//! # Evaluators
//!
//! One evaluator per operation type, run in two phases:
//!
//! 1. **evaluate** reads the database and the transaction's pending effects
//!    and decides whether the operation is legal. It never writes to the
//!    database; what the operation will do is booked in
//!    [`PendingEffects`](crate::domain::PendingEffects) so later operations
//!    of the same transaction see it.
//! 2. **apply** runs only after every operation of the transaction
//!    evaluated successfully, and performs the writes. An apply error means
//!    evaluate missed something and is fatal.
//!
//! The fee is handled around both phases by [`prepare_fee`] and
//! [`pay_fee`], so individual evaluators only deal with their own rules.

pub mod account;
pub mod assert;
pub mod asset;
pub mod balance;
pub mod committee;
pub mod fee;
pub mod market;
pub mod proposal;
pub mod transfer;

pub use account::*;
pub use assert::*;
pub use asset::*;
pub use balance::*;
pub use committee::*;
pub use fee::*;
pub use market::*;
pub use proposal::*;
pub use transfer::*;

use crate::database::Database;
use crate::domain::{
    AccountObject, AssetDynamicDataObject, AssetObject, BalanceObject, LimitOrderObject,
    ProposalObject, TransactionEvaluationState,
};
use crate::errors::ChainError;
use ledger_object_store::Object;
use shared_types::{
    AccountId, Asset, AssetId, BalanceId, ChainParameters, LimitOrderId, Operation,
    OperationPayload, OperationResult, ProposalId, ShareType, TimePointSec, TypedId,
};

/// Typed logic of one operation type.
pub trait Evaluator: Default + std::fmt::Debug {
    type Operation: OperationPayload;

    /// Checks the operation against the database and books its effects.
    fn evaluate(
        &mut self,
        ctx: &mut EvalContext<'_>,
        op: &Self::Operation,
    ) -> Result<(), ChainError>;

    /// Writes the operation's effects. Only called after a successful
    /// `evaluate` of every operation in the transaction.
    fn apply(
        &mut self,
        db: &mut Database,
        op: &Self::Operation,
    ) -> Result<OperationResult, ChainError>;
}

// =============================================================================
// EVALUATION CONTEXT
// =============================================================================

/// Read-only view of the database plus the transaction's scratch state.
pub struct EvalContext<'a> {
    pub db: &'a Database,
    pub state: &'a mut TransactionEvaluationState,
}

impl<'a> EvalContext<'a> {
    pub fn new(db: &'a Database, state: &'a mut TransactionEvaluationState) -> Self {
        Self { db, state }
    }

    pub fn now(&self) -> Result<TimePointSec, ChainError> {
        self.db.head_block_time()
    }

    pub fn parameters(&self) -> Result<&'a ChainParameters, ChainError> {
        self.db.parameters()
    }

    pub fn account(&self, id: AccountId) -> Result<&'a AccountObject, ChainError> {
        self.db.get(id)
    }

    pub fn asset(&self, id: AssetId) -> Result<&'a AssetObject, ChainError> {
        self.db.get(id)
    }

    pub fn dynamic_data(&self, asset: &AssetObject) -> Result<&'a AssetDynamicDataObject, ChainError> {
        self.db.get(asset.dynamic_asset_data_id)
    }

    pub fn limit_order(&self, id: LimitOrderId) -> Result<&'a LimitOrderObject, ChainError> {
        self.unconsumed(id)
    }

    pub fn proposal(&self, id: ProposalId) -> Result<&'a ProposalObject, ChainError> {
        self.unconsumed(id)
    }

    pub fn balance_object(&self, id: BalanceId) -> Result<&'a BalanceObject, ChainError> {
        self.unconsumed(id)
    }

    /// An object an earlier operation of this transaction has not used up.
    fn unconsumed<T: Object>(&self, id: T::Id) -> Result<&'a T, ChainError> {
        if self.state.effects.is_consumed(id.object_id()) {
            return Err(ChainError::AlreadyConsumed(id.object_id()));
        }
        self.db.get(id)
    }

    /// Balance as it will be once the operations evaluated so far apply.
    pub fn balance(&self, account: AccountId, asset: AssetId) -> ShareType {
        self.db.balance(account, asset) + self.state.effects.balance_delta(account, asset)
    }

    /// Books a withdrawal, failing if the pending balance cannot cover it.
    pub fn debit(&mut self, account: AccountId, amount: Asset) -> Result<(), ChainError> {
        let balance = self.balance(account, amount.asset_id);
        if balance < amount.amount {
            return Err(ChainError::InsufficientBalance {
                account,
                asset: amount.asset_id,
                balance,
                required: amount.amount,
            });
        }
        self.state
            .effects
            .adjust_balance(account, amount.asset_id, -amount.amount)
    }

    pub fn credit(&mut self, account: AccountId, amount: Asset) -> Result<(), ChainError> {
        self.state
            .effects
            .adjust_balance(account, amount.asset_id, amount.amount)
    }

    pub fn current_supply(&self, asset: &AssetObject) -> Result<ShareType, ChainError> {
        let data = self.dynamic_data(asset)?;
        Ok(data.current_supply + self.state.effects.supply_delta(asset.id))
    }

    pub fn fee_pool(&self, asset: &AssetObject) -> Result<ShareType, ChainError> {
        let data = self.dynamic_data(asset)?;
        Ok(data.fee_pool + self.state.effects.fee_pool_delta(asset.id))
    }
}

// =============================================================================
// DISPATCH
// =============================================================================

macro_rules! evaluator_table {
    ($($variant:ident => $evaluator:ty),+ $(,)?) => {
        /// An evaluator that accepted its operation and holds what it
        /// learned for the apply phase.
        #[derive(Debug)]
        pub enum PreparedEvaluator {
            $($variant($evaluator)),+
        }

        /// Runs the evaluator registered for the operation's tag.
        pub fn evaluate_operation(
            ctx: &mut EvalContext<'_>,
            op: &Operation,
        ) -> Result<PreparedEvaluator, ChainError> {
            match op {
                $(Operation::$variant(inner) => {
                    let mut evaluator = <$evaluator>::default();
                    evaluator.evaluate(ctx, inner)?;
                    Ok(PreparedEvaluator::$variant(evaluator))
                })+
            }
        }

        impl PreparedEvaluator {
            pub fn apply(self, db: &mut Database, op: &Operation) -> Result<OperationResult, ChainError> {
                match (self, op) {
                    $((PreparedEvaluator::$variant(mut evaluator), Operation::$variant(inner)) => {
                        evaluator.apply(db, inner)
                    })+
                    (_, op) => Err(ChainError::Inconsistent(format!(
                        "evaluator prepared for another operation than {}",
                        op.name()
                    ))),
                }
            }
        }
    };
}

evaluator_table! {
    Transfer => TransferEvaluator,
    LimitOrderCreate => LimitOrderCreateEvaluator,
    LimitOrderCancel => LimitOrderCancelEvaluator,
    AccountCreate => AccountCreateEvaluator,
    AccountUpdate => AccountUpdateEvaluator,
    AssetCreate => AssetCreateEvaluator,
    AssetIssue => AssetIssueEvaluator,
    AssetReserve => AssetReserveEvaluator,
    AssetFundFeePool => AssetFundFeePoolEvaluator,
    ProposalCreate => ProposalCreateEvaluator,
    ProposalUpdate => ProposalUpdateEvaluator,
    ProposalDelete => ProposalDeleteEvaluator,
    CommitteeMemberUpdateGlobalParameters => CommitteeUpdateEvaluator,
    Assert => AssertEvaluator,
    BalanceClaim => BalanceClaimEvaluator,
}

/// An operation that passed evaluation, with its fee settled.
#[derive(Debug)]
pub struct PreparedOperation {
    pub fee: PreparedFee,
    pub evaluator: PreparedEvaluator,
}

/// Evaluate phase of one operation: fee first, then the operation's rules.
pub fn evaluate(ctx: &mut EvalContext<'_>, op: &Operation) -> Result<PreparedOperation, ChainError> {
    let fee = prepare_fee(ctx, op)?;
    let evaluator = evaluate_operation(ctx, op)?;
    Ok(PreparedOperation { fee, evaluator })
}

impl PreparedOperation {
    /// Apply phase of one operation.
    pub fn apply(self, db: &mut Database, op: &Operation) -> Result<OperationResult, ChainError> {
        pay_fee(db, &self.fee)?;
        self.evaluator.apply(db, op)
    }
}
