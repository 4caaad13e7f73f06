//! # Configuration
//!
//! [`ChainConfig`] holds node-local settings that never affect consensus
//! on their own. [`GenesisConfig`] describes the initial state; everything
//! consensus-relevant after genesis lives in the chain parameters and only
//! changes through committee proposals.

use crate::domain::SkipFlags;
use ledger_object_store::DEFAULT_MAX_UNDO_HISTORY;
use serde::{Deserialize, Serialize};
use shared_types::{codec, Authority, ChainId, ChainParameters, ProtocolError, PublicKey, ShareType, TimePointSec};
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    /// Overrides the chain id derived from the genesis state.
    pub chain_id: Option<ChainId>,

    /// Reversible blocks kept for popping and fork switches
    pub max_undo_history: usize,

    /// Checks this node skips for every transaction and block
    pub skip_flags: SkipFlags,

    /// How deep proposals may execute proposals
    pub max_proposal_nesting: u32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: None,
            max_undo_history: DEFAULT_MAX_UNDO_HISTORY,
            skip_flags: SkipFlags::empty(),
            max_proposal_nesting: 2,
        }
    }
}

impl ChainConfig {
    /// Create configuration from environment variables.
    ///
    /// - `LEDGER_CHAIN_ID`: 64 hex characters (default: derived from genesis)
    /// - `LEDGER_MAX_UNDO_HISTORY`: Reversible blocks (default: 1000)
    /// - `LEDGER_SKIP_FLAGS`: Skip flag bits, decimal (default: 0)
    /// - `LEDGER_MAX_PROPOSAL_NESTING`: Proposal nesting depth (default: 2)
    ///
    /// Unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            chain_id: env::var("LEDGER_CHAIN_ID")
                .ok()
                .and_then(|v| parse_chain_id(&v)),

            max_undo_history: env::var("LEDGER_MAX_UNDO_HISTORY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_undo_history),

            skip_flags: env::var("LEDGER_SKIP_FLAGS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(SkipFlags::from_bits_truncate)
                .unwrap_or(defaults.skip_flags),

            max_proposal_nesting: env::var("LEDGER_MAX_PROPOSAL_NESTING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_proposal_nesting),
        }
    }
}

fn parse_chain_id(value: &str) -> Option<ChainId> {
    hex::decode(value.trim()).ok()?.try_into().ok()
}

// =============================================================================
// GENESIS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub name: String,
    pub owner_key: PublicKey,
    pub active_key: PublicKey,
}

/// Liquid core balance credited to a genesis account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBalance {
    pub account_name: String,
    pub amount: ShareType,
}

/// Core balance claimable with the owner key, optionally vesting linearly
/// from the genesis timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisClaimableBalance {
    pub owner: PublicKey,
    pub amount: ShareType,
    pub vesting_duration_seconds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub initial_timestamp: TimePointSec,
    pub initial_parameters: ChainParameters,
    pub committee_authority: Authority,
    pub core_symbol: String,
    pub max_core_supply: ShareType,
    pub initial_accounts: Vec<GenesisAccount>,
    pub initial_balances: Vec<GenesisBalance>,
    pub initial_claimable_balances: Vec<GenesisClaimableBalance>,
}

impl GenesisConfig {
    /// Minimal genesis whose committee is controlled by `committee_key`.
    pub fn new(committee_key: PublicKey, initial_timestamp: TimePointSec) -> Self {
        Self {
            initial_timestamp,
            initial_parameters: ChainParameters::default(),
            committee_authority: Authority::single_key(committee_key),
            core_symbol: "CORE".to_string(),
            max_core_supply: 1_000_000_000_000_000,
            initial_accounts: Vec::new(),
            initial_balances: Vec::new(),
            initial_claimable_balances: Vec::new(),
        }
    }

    /// Hash of the packed genesis state.
    pub fn chain_id(&self) -> Result<ChainId, ProtocolError> {
        codec::hash_packed(self)
    }
}
