//! # Ledger Database
//!
//! The chain state machine: an [`ObjectDatabase`] plus the pipelines that
//! change it.
//!
//! ## Nesting of undo sessions
//!
//! ```text
//! block session        committed per block, popped by pop_block
//!   pending session    all pending transactions, undone before a block
//!     transaction      merged on success, undone on failure
//!       proposal       merged on success, undone on failure
//! ```
//!
//! A failure that leaves the state in doubt (a failed undo, an apply error
//! after successful evaluation) halts the database. Every mutating call
//! returns [`ChainError::Halted`] until a snapshot is restored.

pub mod block;
mod genesis;
pub mod proposal;
pub mod snapshot;
pub mod transaction;

pub use snapshot::*;

use crate::config::{ChainConfig, GenesisConfig};
use crate::domain::{
    register_indexes, AccountBalanceObject, AccountObject, AssetDynamicDataId,
    AssetDynamicDataObject, AssetObject, AssetsBySymbol, AccountsByName, AuthorityLookup,
    BalancesByOwnerAsset, DynamicGlobalPropertyId, DynamicGlobalPropertyObject, GlobalPropertyId,
    GlobalPropertyObject, SkipFlags,
};
use crate::errors::ChainError;
use crate::ports::SignatureVerifier;
use ledger_object_store::{GenericIndex, Object, ObjectDatabase, SecondaryIndex, UndoSession};
use ledger_telemetry::{HEAD_BLOCK_NUMBER, UNDO_STACK_DEPTH};
use shared_types::{
    AccountId, Asset, AssetId, Authority, AuthorityClass, BlockId, ChainId, ChainParameters,
    ProcessedTransaction, ProposalId, ProtocolError, ShareType, SignedBlock, TimePointSec,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{error, info};

pub struct Database {
    objects: ObjectDatabase,
    config: ChainConfig,
    chain_id: ChainId,
    skip_flags: SkipFlags,
    verifier: Arc<dyn SignatureVerifier>,
    /// Transactions applied on top of the head block, in arrival order.
    pending: Vec<ProcessedTransaction>,
    pending_session: Option<UndoSession>,
    /// Blocks whose undo state is still on the stack, oldest first.
    recent_blocks: VecDeque<SignedBlock>,
    halted: Option<String>,
    proposal_depth: u32,
    /// Proposals approved by the operations being applied, executed once
    /// the whole operation list has applied.
    queued_proposals: Vec<ProposalId>,
}

impl Database {
    /// Registers the indexes and writes the genesis state.
    pub fn open(
        config: ChainConfig,
        genesis: &GenesisConfig,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Result<Self, ChainError> {
        let mut objects = ObjectDatabase::new();
        register_indexes(&mut objects)?;
        objects.set_max_undo_size(config.max_undo_history);
        let chain_id = match config.chain_id {
            Some(chain_id) => chain_id,
            None => genesis.chain_id()?,
        };

        let mut db = Self {
            objects,
            skip_flags: config.skip_flags,
            config,
            chain_id,
            verifier,
            pending: Vec::new(),
            pending_session: None,
            recent_blocks: VecDeque::new(),
            halted: None,
            proposal_depth: 0,
            queued_proposals: Vec::new(),
        };
        db.init_genesis(genesis)?;
        db.update_gauges();
        info!(
            chain_id = %hex::encode(db.chain_id),
            accounts = db.objects.index::<AccountObject>()?.len(),
            "Ledger database opened"
        );
        Ok(db)
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// The underlying object store, read only.
    pub fn objects(&self) -> &ObjectDatabase {
        &self.objects
    }

    pub fn get<T: Object>(&self, id: T::Id) -> Result<&T, ChainError> {
        Ok(self.objects.get(id)?)
    }

    pub fn find<T: Object>(&self, id: T::Id) -> Option<&T> {
        self.objects.find(id)
    }

    pub fn index<T: Object>(&self) -> Result<&GenericIndex<T>, ChainError> {
        Ok(self.objects.index::<T>()?)
    }

    /// A secondary index registered by [`register_indexes`].
    pub fn secondary<T: Object, S: SecondaryIndex<T>>(&self) -> Result<&S, ChainError> {
        self.index::<T>()?.secondary::<S>().ok_or_else(|| {
            ChainError::Inconsistent(format!(
                "secondary index {} missing",
                std::any::type_name::<S>()
            ))
        })
    }

    pub fn global_properties(&self) -> Result<&GlobalPropertyObject, ChainError> {
        self.get(GlobalPropertyId(0))
    }

    pub fn dynamic_global_properties(&self) -> Result<&DynamicGlobalPropertyObject, ChainError> {
        self.get(DynamicGlobalPropertyId(0))
    }

    pub fn parameters(&self) -> Result<&ChainParameters, ChainError> {
        Ok(&self.global_properties()?.parameters)
    }

    pub fn head_block_num(&self) -> Result<u32, ChainError> {
        Ok(self.dynamic_global_properties()?.head_block_number)
    }

    pub fn head_block_id(&self) -> Result<BlockId, ChainError> {
        Ok(self.dynamic_global_properties()?.head_block_id)
    }

    pub fn head_block_time(&self) -> Result<TimePointSec, ChainError> {
        Ok(self.dynamic_global_properties()?.time)
    }

    pub fn account_by_name(&self, name: &str) -> Option<&AccountObject> {
        let id = self.secondary::<AccountObject, AccountsByName>().ok()?.find(name)?;
        self.find(id)
    }

    pub fn asset_by_symbol(&self, symbol: &str) -> Option<&AssetObject> {
        let id = self.secondary::<AssetObject, AssetsBySymbol>().ok()?.find(symbol)?;
        self.find(id)
    }

    pub fn balance_object(&self, owner: AccountId, asset: AssetId) -> Option<&AccountBalanceObject> {
        let id = self
            .secondary::<AccountBalanceObject, BalancesByOwnerAsset>()
            .ok()?
            .find(&(owner, asset))?;
        self.find(id)
    }

    /// Zero for an account that never held the asset.
    pub fn balance(&self, owner: AccountId, asset: AssetId) -> ShareType {
        self.balance_object(owner, asset)
            .map(|balance| balance.balance)
            .unwrap_or(0)
    }

    pub fn get_balance(&self, owner: AccountId, asset: AssetId) -> Asset {
        Asset::new(self.balance(owner, asset), asset)
    }

    pub fn pending_transactions(&self) -> &[ProcessedTransaction] {
        &self.pending
    }

    /// Blocks that [`pop_block`](Self::pop_block) can still take back.
    pub fn reversible_blocks(&self) -> impl Iterator<Item = &SignedBlock> + '_ {
        self.recent_blocks.iter()
    }

    pub fn skip_flags(&self) -> SkipFlags {
        self.skip_flags
    }

    pub fn set_skip_flags(&mut self, flags: SkipFlags) {
        self.skip_flags = flags;
    }

    /// Runs `f` with `flags` in place of the configured skip flags.
    pub fn with_skip_flags<R>(&mut self, flags: SkipFlags, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.skip_flags, flags);
        let result = f(self);
        self.skip_flags = previous;
        result
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    pub fn halt_reason(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    // =========================================================================
    // WRITES (crate internal)
    // =========================================================================

    pub(crate) fn create<T: Object>(&mut self, build: impl FnOnce(T::Id) -> T) -> Result<&T, ChainError> {
        Ok(self.objects.create(build)?)
    }

    pub(crate) fn modify<T: Object>(&mut self, id: T::Id, mutate: impl FnOnce(&mut T)) -> Result<&T, ChainError> {
        Ok(self.objects.modify(id, mutate)?)
    }

    pub(crate) fn remove<T: Object>(&mut self, id: T::Id) -> Result<T, ChainError> {
        Ok(self.objects.remove(id)?)
    }

    /// Adds `delta` (which may be negative) to an account balance,
    /// creating the balance object on first deposit.
    pub(crate) fn adjust_balance(&mut self, owner: AccountId, delta: Asset) -> Result<(), ChainError> {
        if delta.amount == 0 {
            return Ok(());
        }
        let insufficient = |balance: ShareType| ChainError::InsufficientBalance {
            account: owner,
            asset: delta.asset_id,
            balance,
            required: -delta.amount,
        };
        match self.balance_object(owner, delta.asset_id).map(|b| (b.id, b.balance)) {
            Some((id, balance)) => {
                let updated = balance
                    .checked_add(delta.amount)
                    .ok_or(ProtocolError::Overflow("account balance"))?;
                if updated < 0 {
                    return Err(insufficient(balance));
                }
                self.modify::<AccountBalanceObject>(id, |b| b.balance = updated)?;
            }
            None => {
                if delta.amount < 0 {
                    return Err(insufficient(0));
                }
                self.create::<AccountBalanceObject>(|id| AccountBalanceObject {
                    id,
                    owner,
                    asset_type: delta.asset_id,
                    balance: delta.amount,
                })?;
            }
        }
        Ok(())
    }

    pub(crate) fn debit(&mut self, owner: AccountId, amount: Asset) -> Result<(), ChainError> {
        self.adjust_balance(owner, Asset::new(-amount.amount, amount.asset_id))
    }

    pub(crate) fn credit(&mut self, owner: AccountId, amount: Asset) -> Result<(), ChainError> {
        self.adjust_balance(owner, amount)
    }

    pub(crate) fn adjust_asset_data(
        &mut self,
        id: AssetDynamicDataId,
        delta: AssetDataDelta,
    ) -> Result<(), ChainError> {
        let data = self.get::<AssetDynamicDataObject>(id)?;
        let add = |value: ShareType, by: ShareType, what: &'static str| -> Result<ShareType, ChainError> {
            let sum = value.checked_add(by).ok_or(ProtocolError::Overflow(what))?;
            if sum < 0 {
                return Err(ChainError::Inconsistent(format!("{what} of {id} would turn negative")));
            }
            Ok(sum)
        };
        let current_supply = add(data.current_supply, delta.supply, "current supply")?;
        let accumulated_fees = add(data.accumulated_fees, delta.accumulated_fees, "accumulated fees")?;
        let fee_pool = add(data.fee_pool, delta.fee_pool, "fee pool")?;
        self.modify::<AssetDynamicDataObject>(id, |data| {
            data.current_supply = current_supply;
            data.accumulated_fees = accumulated_fees;
            data.fee_pool = fee_pool;
        })?;
        Ok(())
    }

    // =========================================================================
    // FAILURE HANDLING
    // =========================================================================

    pub(crate) fn ensure_running(&self) -> Result<(), ChainError> {
        match &self.halted {
            Some(reason) => Err(ChainError::Halted(reason.clone())),
            None => Ok(()),
        }
    }

    /// Stops all further mutation. The first reason sticks.
    pub(crate) fn halt(&mut self, err: &ChainError) {
        error!(error = %err, "Ledger state is in doubt, halting");
        if self.halted.is_none() {
            self.halted = Some(err.to_string());
        }
    }

    /// Closes `session` by merging or undoing it; a failure to do so
    /// halts the database.
    pub(crate) fn close_session(&mut self, session: UndoSession, keep: bool) -> Result<(), ChainError> {
        let closed = if keep {
            self.objects.merge_session(session)
        } else {
            self.objects.undo_session(session)
        };
        closed.map_err(|err| {
            let err = ChainError::from(err);
            self.halt(&err);
            err
        })
    }

    pub(crate) fn update_gauges(&self) {
        UNDO_STACK_DEPTH.set(self.objects.undo_depth() as i64);
        if let Ok(head) = self.head_block_num() {
            HEAD_BLOCK_NUMBER.set(i64::from(head));
        }
    }
}

impl AuthorityLookup for Database {
    fn authority(&self, account: AccountId, class: AuthorityClass) -> Option<&Authority> {
        self.find::<AccountObject>(account)
            .map(|account| account.authority(class))
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("chain_id", &hex::encode(self.chain_id))
            .field("head_block_num", &self.head_block_num().ok())
            .field("pending", &self.pending.len())
            .field("reversible_blocks", &self.recent_blocks.len())
            .field("halted", &self.halted)
            .finish()
    }
}

/// Signed changes to an asset's dynamic data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetDataDelta {
    pub supply: ShareType,
    pub accumulated_fees: ShareType,
    pub fee_pool: ShareType,
}
