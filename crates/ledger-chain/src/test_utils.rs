//! Test fixtures: a funded chain with named accounts and deterministic keys.
//!
//! Helpers panic on setup failures; the call under test is the one that
//! returns a `Result`.

use crate::adapters::{Ed25519KeyPair, Ed25519Verifier, FixedIntervalClock};
use crate::config::{ChainConfig, GenesisAccount, GenesisBalance, GenesisConfig};
use crate::database::Database;
use crate::domain::{AssetDynamicDataId, AssetObject};
use crate::errors::ChainError;
use shared_types::{
    codec, AccountId, Asset, AssetCreateOperation, AssetId, AssetIssueOperation, AssetOptions,
    ChainParameters, FeeSchedule, Operation, Price, ProcessedTransaction, ShareType,
    SignedBlock, SignedTransaction, TimePointSec, Transaction, TypedId, CORE_ASSET,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Liquid core balance of every genesis account.
pub const FUNDING: ShareType = 1_000_000_000_000;

pub const ACCOUNT_NAMES: [&str; 4] = ["alice", "bob", "carol", "dave"];

pub const GENESIS_TIME: TimePointSec = TimePointSec(1_600_000_000);

/// Seconds until expiration of transactions built by [`TestChain::transaction`].
pub const TRANSACTION_LIFETIME: u32 = 60;

pub fn core(amount: ShareType) -> Asset {
    Asset::core(amount)
}

/// Options for a fresh user asset. The exchange rate base names the next
/// asset id; creation rewrites it to the real one anyway.
pub fn asset_options(max_supply: ShareType) -> AssetOptions {
    AssetOptions {
        max_supply,
        core_exchange_rate: Price::new(Asset::new(1, AssetId(1)), core(1)),
        issuer_permissions: 0,
        flags: 0,
    }
}

/// Key derived from `name`, stable across runs.
pub fn key_for(name: &str) -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed(codec::sha256(name.as_bytes()))
}

#[derive(Debug)]
pub struct TestChain {
    pub db: Database,
    keys: BTreeMap<String, Ed25519KeyPair>,
}

impl TestChain {
    /// Chain without fees.
    pub fn new() -> Self {
        Self::with_fees(FeeSchedule::free())
    }

    pub fn with_fees(fees: FeeSchedule) -> Self {
        Self::with_parameters(ChainParameters {
            current_fees: fees,
            ..ChainParameters::default()
        })
    }

    pub fn with_parameters(parameters: ChainParameters) -> Self {
        Self::try_with_genesis(|genesis| genesis.initial_parameters = parameters)
            .expect("test genesis is valid")
    }

    /// Genesis with the committee, every account of [`ACCOUNT_NAMES`]
    /// holding [`FUNDING`], and a free fee schedule, edited by `customize`
    /// before the chain opens.
    pub fn try_with_genesis(customize: impl FnOnce(&mut GenesisConfig)) -> Result<Self, ChainError> {
        let mut keys = BTreeMap::new();
        let committee = key_for("committee");
        let mut genesis = GenesisConfig::new(committee.public_key(), GENESIS_TIME);
        genesis.initial_parameters.current_fees = FeeSchedule::free();
        keys.insert("committee".to_string(), committee);

        for name in ACCOUNT_NAMES {
            let owner_name = format!("{name}-owner");
            let active = key_for(name);
            let owner = key_for(&owner_name);
            genesis.initial_accounts.push(GenesisAccount {
                name: name.to_string(),
                owner_key: owner.public_key(),
                active_key: active.public_key(),
            });
            genesis.initial_balances.push(GenesisBalance {
                account_name: name.to_string(),
                amount: FUNDING,
            });
            keys.insert(name.to_string(), active);
            keys.insert(owner_name, owner);
        }
        customize(&mut genesis);

        let db = Database::open(ChainConfig::default(), &genesis, Arc::new(Ed25519Verifier))?;
        Ok(Self { db, keys })
    }

    /// Registers a key under `name` for [`sign`](Self::sign).
    pub fn add_key(&mut self, name: &str) -> &Ed25519KeyPair {
        self.keys.entry(name.to_string()).or_insert_with(|| key_for(name))
    }

    /// Key named `name`; `"<account>-owner"` names an owner key.
    pub fn key(&self, name: &str) -> &Ed25519KeyPair {
        self.keys
            .get(name)
            .unwrap_or_else(|| panic!("no test key named {name}"))
    }

    pub fn account(&self, name: &str) -> AccountId {
        self.db
            .account_by_name(name)
            .unwrap_or_else(|| panic!("no account named {name}"))
            .id
    }

    /// Core balance.
    pub fn balance(&self, account: AccountId) -> ShareType {
        self.db.balance(account, CORE_ASSET)
    }

    pub fn balance_of(&self, account: AccountId, asset: AssetId) -> ShareType {
        self.db.balance(account, asset)
    }

    pub fn head_time(&self) -> TimePointSec {
        self.db.head_block_time().expect("head block time")
    }

    pub fn asset_data(&self, asset: AssetId) -> AssetDynamicDataId {
        self.db
            .get::<AssetObject>(asset)
            .expect("asset exists")
            .dynamic_asset_data_id
    }

    /// Unsigned transaction referencing the head block.
    pub fn transaction(&self, operations: Vec<Operation>) -> Transaction {
        let mut trx = Transaction {
            operations,
            ..Transaction::default()
        };
        trx.set_reference_block(&self.db.head_block_id().expect("head block id"));
        trx.set_expiration(self.head_time().saturating_add(TRANSACTION_LIFETIME));
        trx
    }

    pub fn sign(&self, signers: &[&str], operations: Vec<Operation>) -> SignedTransaction {
        self.sign_transaction(signers, self.transaction(operations))
    }

    pub fn sign_transaction(&self, signers: &[&str], trx: Transaction) -> SignedTransaction {
        let mut signed = SignedTransaction::new(trx);
        for signer in signers {
            self.key(signer)
                .sign_transaction(&mut signed, self.db.chain_id())
                .expect("transaction signs");
        }
        signed
    }

    pub fn push(
        &mut self,
        signers: &[&str],
        operations: Vec<Operation>,
    ) -> Result<ProcessedTransaction, ChainError> {
        let trx = self.sign(signers, operations);
        self.db.push_transaction(trx)
    }

    /// Like [`push`](Self::push), with every fee set in core first.
    pub fn push_with_fees(
        &mut self,
        signers: &[&str],
        mut operations: Vec<Operation>,
    ) -> Result<ProcessedTransaction, ChainError> {
        for op in &mut operations {
            self.set_fee(op, CORE_ASSET);
        }
        self.push(signers, operations)
    }

    /// Sets the fee of `op` to the schedule's minimum, paid in `asset`.
    pub fn set_fee(&self, op: &mut Operation, asset: AssetId) -> Asset {
        let rate = if asset == CORE_ASSET {
            Price::unit_price(CORE_ASSET)
        } else {
            *self
                .db
                .get::<AssetObject>(asset)
                .expect("fee asset exists")
                .core_exchange_rate()
        };
        self.db
            .parameters()
            .expect("chain parameters")
            .current_fees
            .set_fee(op, &rate)
            .expect("fee computes")
    }

    pub fn create_asset(&mut self, issuer: &str, symbol: &str, options: AssetOptions) -> AssetId {
        let op = AssetCreateOperation {
            fee: core(0),
            issuer: self.account(issuer),
            symbol: symbol.to_string(),
            precision: 2,
            common_options: options,
        };
        let processed = self
            .push_with_fees(&[issuer], vec![op.into()])
            .unwrap_or_else(|err| panic!("creating {symbol} failed: {err}"));
        match processed.operation_results[0] {
            shared_types::OperationResult::ObjectId(id) => AssetId::from_instance(id.instance()),
            ref other => panic!("asset create returned {other:?}"),
        }
    }

    pub fn issue(&mut self, issuer: &str, asset: AssetId, amount: ShareType, to: AccountId) {
        self.try_issue(issuer, asset, amount, to)
            .unwrap_or_else(|err| panic!("issuing {amount} of {asset} failed: {err}"));
    }

    pub fn try_issue(
        &mut self,
        issuer: &str,
        asset: AssetId,
        amount: ShareType,
        to: AccountId,
    ) -> Result<ProcessedTransaction, ChainError> {
        let op = AssetIssueOperation {
            fee: core(0),
            issuer: self.account(issuer),
            asset_to_issue: Asset::new(amount, asset),
            issue_to_account: to,
            memo: None,
        };
        self.push_with_fees(&[issuer], vec![op.into()])
    }

    /// Produces the next block from the pending transactions.
    pub fn produce_block(&mut self) -> SignedBlock {
        self.db
            .generate_next_block(&FixedIntervalClock)
            .unwrap_or_else(|err| panic!("block production failed: {err}"))
    }
}

impl Default for TestChain {
    fn default() -> Self {
        Self::new()
    }
}
