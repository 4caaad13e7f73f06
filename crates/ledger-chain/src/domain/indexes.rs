//! Index registration for every ledger object type.

use super::objects::*;
use ledger_object_store::{DbError, ObjectDatabase, OrderedIndex, UniqueIndex};
use shared_types::{AccountId, AssetId, PublicKey, TimePointSec, TransactionId};

pub type AccountsByName = UniqueIndex<AccountObject, String>;
pub type AssetsBySymbol = UniqueIndex<AssetObject, String>;
pub type BalancesByOwnerAsset = UniqueIndex<AccountBalanceObject, (AccountId, AssetId)>;
pub type OrdersByPrice = OrderedIndex<LimitOrderObject, OrderBookKey>;
pub type OrdersByExpiration = OrderedIndex<LimitOrderObject, TimePointSec>;
pub type ProposalsByExpiration = OrderedIndex<ProposalObject, TimePointSec>;
pub type ClaimableByOwner = OrderedIndex<BalanceObject, PublicKey>;
pub type HistoryById = UniqueIndex<TransactionHistoryObject, TransactionId>;
pub type HistoryByExpiration = OrderedIndex<TransactionHistoryObject, TimePointSec>;

/// Registers the primary index of every object type and their secondary
/// indexes. Registration order is part of the state's identity: images
/// list indexes by partition, secondary indexes fire in this order.
pub fn register_indexes(db: &mut ObjectDatabase) -> Result<(), DbError> {
    db.add_index::<AccountObject>()?;
    db.add_secondary_index::<AccountObject, _>(AccountsByName::new("account_by_name", |a| {
        a.name.clone()
    }))?;

    db.add_index::<AssetObject>()?;
    db.add_secondary_index::<AssetObject, _>(AssetsBySymbol::new("asset_by_symbol", |a| {
        a.symbol.clone()
    }))?;

    db.add_index::<LimitOrderObject>()?;
    db.add_secondary_index::<LimitOrderObject, _>(OrdersByPrice::new(|o| {
        OrderBookKey(o.sell_price)
    }))?;
    db.add_secondary_index::<LimitOrderObject, _>(OrdersByExpiration::new(|o| o.expiration))?;

    db.add_index::<ProposalObject>()?;
    db.add_secondary_index::<ProposalObject, _>(ProposalsByExpiration::new(|p| {
        p.expiration_time
    }))?;

    db.add_index::<BalanceObject>()?;
    db.add_secondary_index::<BalanceObject, _>(ClaimableByOwner::new(|b| b.owner))?;

    db.add_index::<GlobalPropertyObject>()?;
    db.add_index::<DynamicGlobalPropertyObject>()?;
    db.add_index::<AssetDynamicDataObject>()?;

    db.add_index::<AccountBalanceObject>()?;
    db.add_secondary_index::<AccountBalanceObject, _>(BalancesByOwnerAsset::new(
        "balance_by_owner_asset",
        |b| (b.owner, b.asset_type),
    ))?;

    db.add_index::<TransactionHistoryObject>()?;
    db.add_secondary_index::<TransactionHistoryObject, _>(HistoryById::new(
        "transaction_by_id",
        |t| t.trx_id,
    ))?;
    db.add_secondary_index::<TransactionHistoryObject, _>(HistoryByExpiration::new(|t| {
        t.expiration
    }))?;

    db.add_index::<BlockSummaryObject>()?;
    Ok(())
}
