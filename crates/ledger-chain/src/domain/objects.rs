//! # Ledger Objects
//!
//! Every record the ledger keeps. Protocol objects (space 1) are what
//! operations reference; implementation objects (space 2) are bookkeeping
//! owned by the engine.

use ledger_object_store::Object;
use serde::{Deserialize, Serialize};
use shared_types::{
    typed_id, AccountId, Asset, AssetId, AssetOptions, Authority, AuthorityClass, BalanceId,
    BlockId, ChainParameters, LimitOrderId, Price, ProposalId, PublicKey, ShareType,
    TimePointSec, Transaction, TransactionId, IMPLEMENTATION_SPACE, TRANSFER_RESTRICTED,
};
use std::cmp::Ordering;
use std::collections::BTreeSet;

// =============================================================================
// IMPLEMENTATION IDS
// =============================================================================

typed_id! {
    /// Global properties (2.0.0); a singleton.
    pub struct GlobalPropertyId(IMPLEMENTATION_SPACE, 0);
}

typed_id! {
    /// Dynamic global properties (2.1.0); a singleton.
    pub struct DynamicGlobalPropertyId(IMPLEMENTATION_SPACE, 1);
}

typed_id! {
    /// Supply and fee pool of one asset (2.3.x).
    pub struct AssetDynamicDataId(IMPLEMENTATION_SPACE, 3);
}

typed_id! {
    /// Holding of one asset by one account (2.5.x).
    pub struct AccountBalanceId(IMPLEMENTATION_SPACE, 5);
}

typed_id! {
    /// Recently applied transaction (2.7.x).
    pub struct TransactionHistoryId(IMPLEMENTATION_SPACE, 7);
}

typed_id! {
    /// Id of a recent block, at `block_num & 0xffff` (2.8.x).
    pub struct BlockSummaryId(IMPLEMENTATION_SPACE, 8);
}

/// Number of block summaries kept; the TaPoS window.
pub const BLOCK_SUMMARY_SLOTS: u64 = 0x1_0000;

/// Instance of the block summary slot holding block `block_num`.
pub fn block_summary_id(block_num: u32) -> BlockSummaryId {
    BlockSummaryId(u64::from(block_num) & (BLOCK_SUMMARY_SLOTS - 1))
}

// =============================================================================
// PROTOCOL OBJECTS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountObject {
    pub id: AccountId,
    pub registrar: AccountId,
    pub name: String,
    pub owner: Authority,
    pub active: Authority,
    pub memo_key: PublicKey,
}

impl AccountObject {
    pub fn authority(&self, class: AuthorityClass) -> &Authority {
        match class {
            AuthorityClass::Active => &self.active,
            AuthorityClass::Owner => &self.owner,
        }
    }
}

impl Object for AccountObject {
    type Id = AccountId;

    fn id(&self) -> AccountId {
        self.id
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetObject {
    pub id: AssetId,
    pub symbol: String,
    pub precision: u8,
    pub issuer: AccountId,
    pub options: AssetOptions,
    pub dynamic_asset_data_id: AssetDynamicDataId,
}

impl AssetObject {
    pub fn is_transfer_restricted(&self) -> bool {
        self.options.flags & TRANSFER_RESTRICTED != 0
    }

    pub fn core_exchange_rate(&self) -> &Price {
        &self.options.core_exchange_rate
    }

    pub fn amount(&self, amount: ShareType) -> Asset {
        Asset::new(amount, self.id)
    }
}

impl Object for AssetObject {
    type Id = AssetId;

    fn id(&self) -> AssetId {
        self.id
    }
}

/// An open order escrowing `for_sale` units of the sell asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrderObject {
    pub id: LimitOrderId,
    pub seller: AccountId,
    pub for_sale: ShareType,
    pub sell_price: Price,
    pub expiration: TimePointSec,
}

impl LimitOrderObject {
    pub fn amount_for_sale(&self) -> Asset {
        Asset::new(self.for_sale, self.sell_price.base.asset_id)
    }
}

impl Object for LimitOrderObject {
    type Id = LimitOrderId;

    fn id(&self) -> LimitOrderId {
        self.id
    }
}

/// Order book position: grouped by market, then by price.
#[derive(Clone, Debug)]
pub struct OrderBookKey(pub Price);

impl OrderBookKey {
    fn market(&self) -> (AssetId, AssetId) {
        (self.0.base.asset_id, self.0.quote.asset_id)
    }
}

impl Ord for OrderBookKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.market()
            .cmp(&other.market())
            .then_with(|| self.0.compare(&other.0).unwrap_or(Ordering::Equal))
    }
}

impl PartialOrd for OrderBookKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OrderBookKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderBookKey {}

/// A transaction waiting for approvals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalObject {
    pub id: ProposalId,
    pub proposer: AccountId,
    pub expiration_time: TimePointSec,
    /// Start of the review period, after which approvals may only be
    /// removed and execution waits for expiration.
    pub review_period_time: Option<TimePointSec>,
    pub proposed_transaction: Transaction,
    pub required_active_approvals: BTreeSet<AccountId>,
    pub available_active_approvals: BTreeSet<AccountId>,
    pub required_owner_approvals: BTreeSet<AccountId>,
    pub available_owner_approvals: BTreeSet<AccountId>,
    pub available_key_approvals: BTreeSet<PublicKey>,
    /// Why the last execution attempt failed; empty if none did.
    pub fail_reason: String,
}

impl Object for ProposalObject {
    type Id = ProposalId;

    fn id(&self) -> ProposalId {
        self.id
    }
}

/// Vests `begin_balance` linearly over `vesting_duration_seconds`, nothing
/// before the cliff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearVestingPolicy {
    pub begin_timestamp: TimePointSec,
    pub vesting_cliff_seconds: u32,
    pub vesting_duration_seconds: u32,
    pub begin_balance: ShareType,
}

impl LinearVestingPolicy {
    /// Amount withdrawable at `now` from a balance currently at `balance`.
    pub fn allowed_withdraw(&self, now: TimePointSec, balance: ShareType) -> ShareType {
        if now <= self.begin_timestamp {
            return 0;
        }
        let elapsed = now.seconds_since(self.begin_timestamp);
        if elapsed < self.vesting_cliff_seconds {
            return 0;
        }
        let vested = if elapsed >= self.vesting_duration_seconds {
            i128::from(self.begin_balance)
        } else {
            i128::from(self.begin_balance) * i128::from(elapsed)
                / i128::from(self.vesting_duration_seconds)
        };
        let withdrawn = i128::from(self.begin_balance) - i128::from(balance);
        let allowed = (vested - withdrawn).clamp(0, i128::from(balance));
        allowed as ShareType
    }
}

/// A balance claimable by whoever proves control of `owner`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceObject {
    pub id: BalanceId,
    pub owner: PublicKey,
    pub balance: Asset,
    pub vesting_policy: Option<LinearVestingPolicy>,
    pub last_claim_date: TimePointSec,
}

impl BalanceObject {
    pub fn is_vesting(&self) -> bool {
        self.vesting_policy.is_some()
    }

    pub fn available(&self, now: TimePointSec) -> ShareType {
        match &self.vesting_policy {
            Some(policy) => policy.allowed_withdraw(now, self.balance.amount),
            None => self.balance.amount,
        }
    }
}

impl Object for BalanceObject {
    type Id = BalanceId;

    fn id(&self) -> BalanceId {
        self.id
    }
}

// =============================================================================
// IMPLEMENTATION OBJECTS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalPropertyObject {
    pub id: GlobalPropertyId,
    pub parameters: ChainParameters,
    /// Parameters voted in by the committee; they take effect at the end
    /// of the block that set them.
    pub pending_parameters: Option<ChainParameters>,
}

impl Object for GlobalPropertyObject {
    type Id = GlobalPropertyId;

    fn id(&self) -> GlobalPropertyId {
        self.id
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicGlobalPropertyObject {
    pub id: DynamicGlobalPropertyId,
    pub head_block_number: u32,
    pub head_block_id: BlockId,
    pub time: TimePointSec,
}

impl Object for DynamicGlobalPropertyObject {
    type Id = DynamicGlobalPropertyId;

    fn id(&self) -> DynamicGlobalPropertyId {
        self.id
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDynamicDataObject {
    pub id: AssetDynamicDataId,
    pub current_supply: ShareType,
    /// Fees collected in this asset.
    pub accumulated_fees: ShareType,
    /// Core units that pay the core-denominated part of fees paid in this
    /// asset.
    pub fee_pool: ShareType,
}

impl Object for AssetDynamicDataObject {
    type Id = AssetDynamicDataId;

    fn id(&self) -> AssetDynamicDataId {
        self.id
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalanceObject {
    pub id: AccountBalanceId,
    pub owner: AccountId,
    pub asset_type: AssetId,
    pub balance: ShareType,
}

impl AccountBalanceObject {
    pub fn get_balance(&self) -> Asset {
        Asset::new(self.balance, self.asset_type)
    }
}

impl Object for AccountBalanceObject {
    type Id = AccountBalanceId;

    fn id(&self) -> AccountBalanceId {
        self.id
    }
}

/// Kept until expiration so the same transaction cannot apply twice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHistoryObject {
    pub id: TransactionHistoryId,
    pub trx_id: TransactionId,
    pub expiration: TimePointSec,
}

impl Object for TransactionHistoryObject {
    type Id = TransactionHistoryId;

    fn id(&self) -> TransactionHistoryId {
        self.id
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummaryObject {
    pub id: BlockSummaryId,
    pub block_id: BlockId,
}

impl Object for BlockSummaryObject {
    type Id = BlockSummaryId;

    fn id(&self) -> BlockSummaryId {
        self.id
    }
}
