//! # Transaction Evaluation State
//!
//! Scratch state of one transaction. Evaluators never write to the
//! database; the effects an operation will have once applied are booked
//! here instead, so later operations of the same transaction are
//! evaluated against them.

use super::authority::SignState;
use super::skip_flags::SkipFlags;
use crate::errors::ChainError;
use shared_types::{AccountId, AssetId, ObjectId, OperationResult, ProtocolError, ShareType};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct TransactionEvaluationState {
    pub sign_state: SignState,
    /// Set while executing a proposal; enables proposal-only operations
    /// and skips fee sufficiency checks.
    pub is_proposed_trx: bool,
    pub check_authorities: bool,
    pub skip: SkipFlags,
    pub effects: PendingEffects,
    pub operation_results: Vec<OperationResult>,
}

impl TransactionEvaluationState {
    pub fn new(sign_state: SignState, skip: SkipFlags) -> Self {
        Self {
            sign_state,
            is_proposed_trx: false,
            check_authorities: skip.checks_authorities(),
            skip,
            effects: PendingEffects::default(),
            operation_results: Vec::new(),
        }
    }

    /// State for executing an already approved proposal.
    pub fn proposed(skip: SkipFlags) -> Self {
        Self {
            is_proposed_trx: true,
            check_authorities: false,
            ..Self::new(SignState::default(), skip)
        }
    }
}

/// Deltas of the operations evaluated so far in one transaction.
#[derive(Debug, Clone, Default)]
pub struct PendingEffects {
    balances: BTreeMap<(AccountId, AssetId), ShareType>,
    supply: BTreeMap<AssetId, ShareType>,
    fee_pools: BTreeMap<AssetId, ShareType>,
    consumed: BTreeSet<ObjectId>,
    names: BTreeSet<String>,
    symbols: BTreeSet<String>,
}

fn add<K: Ord>(
    map: &mut BTreeMap<K, ShareType>,
    key: K,
    delta: ShareType,
    what: &'static str,
) -> Result<(), ChainError> {
    let entry = map.entry(key).or_insert(0);
    *entry = entry
        .checked_add(delta)
        .ok_or(ProtocolError::Overflow(what))?;
    Ok(())
}

impl PendingEffects {
    pub fn adjust_balance(
        &mut self,
        account: AccountId,
        asset: AssetId,
        delta: ShareType,
    ) -> Result<(), ChainError> {
        add(&mut self.balances, (account, asset), delta, "pending balance")
    }

    pub fn balance_delta(&self, account: AccountId, asset: AssetId) -> ShareType {
        self.balances.get(&(account, asset)).copied().unwrap_or(0)
    }

    pub fn adjust_supply(&mut self, asset: AssetId, delta: ShareType) -> Result<(), ChainError> {
        add(&mut self.supply, asset, delta, "pending supply")
    }

    pub fn supply_delta(&self, asset: AssetId) -> ShareType {
        self.supply.get(&asset).copied().unwrap_or(0)
    }

    pub fn adjust_fee_pool(&mut self, asset: AssetId, delta: ShareType) -> Result<(), ChainError> {
        add(&mut self.fee_pools, asset, delta, "pending fee pool")
    }

    pub fn fee_pool_delta(&self, asset: AssetId) -> ShareType {
        self.fee_pools.get(&asset).copied().unwrap_or(0)
    }

    /// Marks an object as removed by an earlier operation.
    pub fn consume(&mut self, id: impl Into<ObjectId>) -> Result<(), ChainError> {
        let id = id.into();
        if !self.consumed.insert(id) {
            return Err(ChainError::AlreadyConsumed(id));
        }
        Ok(())
    }

    pub fn is_consumed(&self, id: impl Into<ObjectId>) -> bool {
        self.consumed.contains(&id.into())
    }

    pub fn claim_name(&mut self, name: &str) -> Result<(), ChainError> {
        if !self.names.insert(name.to_string()) {
            return Err(ChainError::NameTaken(name.to_string()));
        }
        Ok(())
    }

    pub fn claim_symbol(&mut self, symbol: &str) -> Result<(), ChainError> {
        if !self.symbols.insert(symbol.to_string()) {
            return Err(ChainError::SymbolTaken(symbol.to_string()));
        }
        Ok(())
    }
}
