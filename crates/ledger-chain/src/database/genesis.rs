//! Initial chain state.

use super::{AssetDataDelta, Database};
use crate::config::GenesisConfig;
use crate::domain::{
    AccountObject, AssetDynamicDataObject, AssetObject, BalanceObject, BlockSummaryObject,
    DynamicGlobalPropertyObject, GlobalPropertyObject, LinearVestingPolicy,
};
use crate::errors::ChainError;
use shared_types::{
    AccountId, Asset, AssetOptions, Authority, BlockId, Price, PublicKey, TimePointSec,
    COMMITTEE_ACCOUNT, CORE_ASSET, NULL_ACCOUNT, TEMP_ACCOUNT,
};
use tracing::debug;

/// Precision of the core asset.
pub const CORE_PRECISION: u8 = 5;

impl Database {
    pub(super) fn init_genesis(&mut self, genesis: &GenesisConfig) -> Result<(), ChainError> {
        genesis.initial_parameters.validate()?;
        genesis.committee_authority.validate()?;
        if genesis.max_core_supply <= 0 {
            return Err(ChainError::Rejected("max core supply must be positive".into()));
        }

        // the special accounts take the first three ids
        let special = [
            (COMMITTEE_ACCOUNT, "committee-account", genesis.committee_authority.clone()),
            (NULL_ACCOUNT, "null-account", Authority::new(1)),
            (TEMP_ACCOUNT, "temp-account", Authority::new(0)),
        ];
        for (expected, name, authority) in special {
            let id = self.create_account(name, authority.clone(), authority, PublicKey::default())?;
            if id != expected {
                return Err(ChainError::Inconsistent(format!("{name} created as {id}")));
            }
        }

        let core_data = self
            .create::<AssetDynamicDataObject>(|id| AssetDynamicDataObject {
                id,
                current_supply: 0,
                accumulated_fees: 0,
                fee_pool: 0,
            })?
            .id;
        let core = self
            .create::<AssetObject>(|id| AssetObject {
                id,
                symbol: genesis.core_symbol.clone(),
                precision: CORE_PRECISION,
                issuer: COMMITTEE_ACCOUNT,
                options: AssetOptions {
                    max_supply: genesis.max_core_supply,
                    core_exchange_rate: Price::unit_price(CORE_ASSET),
                    issuer_permissions: 0,
                    flags: 0,
                },
                dynamic_asset_data_id: core_data,
            })?
            .id;
        if core != CORE_ASSET {
            return Err(ChainError::Inconsistent(format!("core asset created as {core}")));
        }

        self.create::<GlobalPropertyObject>(|id| GlobalPropertyObject {
            id,
            parameters: genesis.initial_parameters.clone(),
            pending_parameters: None,
        })?;
        self.create::<DynamicGlobalPropertyObject>(|id| DynamicGlobalPropertyObject {
            id,
            head_block_number: 0,
            head_block_id: BlockId::default(),
            time: genesis.initial_timestamp,
        })?;
        // slot 0 makes the genesis state a valid TaPoS reference
        self.create::<BlockSummaryObject>(|id| BlockSummaryObject {
            id,
            block_id: BlockId::default(),
        })?;

        for account in &genesis.initial_accounts {
            self.create_account(
                &account.name,
                Authority::single_key(account.owner_key),
                Authority::single_key(account.active_key),
                account.active_key,
            )?;
        }

        let mut supply: i64 = 0;
        for balance in &genesis.initial_balances {
            let owner = self
                .account_by_name(&balance.account_name)
                .map(|account| account.id)
                .ok_or_else(|| {
                    ChainError::Rejected(format!(
                        "genesis balance for unknown account {}",
                        balance.account_name
                    ))
                })?;
            self.credit(owner, Asset::core(balance.amount))?;
            supply = add_supply(supply, balance.amount)?;
        }
        for claimable in &genesis.initial_claimable_balances {
            let vesting_policy = claimable.vesting_duration_seconds.map(|duration| LinearVestingPolicy {
                begin_timestamp: genesis.initial_timestamp,
                vesting_cliff_seconds: 0,
                vesting_duration_seconds: duration,
                begin_balance: claimable.amount,
            });
            self.create::<BalanceObject>(|id| BalanceObject {
                id,
                owner: claimable.owner,
                balance: Asset::core(claimable.amount),
                vesting_policy,
                last_claim_date: TimePointSec::MIN,
            })?;
            supply = add_supply(supply, claimable.amount)?;
        }

        if supply > genesis.max_core_supply {
            return Err(ChainError::Rejected(format!(
                "genesis supply {supply} exceeds max core supply {}",
                genesis.max_core_supply
            )));
        }
        self.adjust_asset_data(
            core_data,
            AssetDataDelta {
                supply,
                ..AssetDataDelta::default()
            },
        )?;
        debug!(
            accounts = genesis.initial_accounts.len(),
            core_supply = supply,
            "Genesis state written"
        );
        Ok(())
    }

    fn create_account(
        &mut self,
        name: &str,
        owner: Authority,
        active: Authority,
        memo_key: PublicKey,
    ) -> Result<AccountId, ChainError> {
        let account = self.create::<AccountObject>(|id| AccountObject {
            id,
            registrar: COMMITTEE_ACCOUNT,
            name: name.to_string(),
            owner,
            active,
            memo_key,
        })?;
        Ok(account.id)
    }
}

fn add_supply(supply: i64, amount: i64) -> Result<i64, ChainError> {
    if amount <= 0 {
        return Err(ChainError::Rejected(format!("genesis amount {amount} is not positive")));
    }
    supply
        .checked_add(amount)
        .ok_or_else(|| ChainError::Rejected("genesis supply overflows".into()))
}
