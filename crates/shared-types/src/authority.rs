//! # Authorities
//!
//! A weighted threshold over keys and other accounts. An authority is
//! satisfied once the weights of the signing keys plus the weights of the
//! satisfied sub-accounts reach `weight_threshold`. Evaluating it against a
//! transaction's signatures is the engine's job; this module holds the data
//! and its stateless checks.

use crate::errors::ProtocolError;
use crate::ids::AccountId;
use crate::keys::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type WeightType = u16;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub weight_threshold: u32,
    pub account_auths: BTreeMap<AccountId, WeightType>,
    pub key_auths: BTreeMap<PublicKey, WeightType>,
}

impl Authority {
    pub fn new(weight_threshold: u32) -> Self {
        Self {
            weight_threshold,
            ..Default::default()
        }
    }

    /// Threshold 1 satisfied by one key.
    pub fn single_key(key: PublicKey) -> Self {
        Self::new(1).with_key(key, 1)
    }

    /// Threshold 1 satisfied by one account.
    pub fn single_account(account: AccountId) -> Self {
        Self::new(1).with_account(account, 1)
    }

    pub fn with_key(mut self, key: PublicKey, weight: WeightType) -> Self {
        self.key_auths.insert(key, weight);
        self
    }

    pub fn with_account(mut self, account: AccountId, weight: WeightType) -> Self {
        self.account_auths.insert(account, weight);
        self
    }

    pub fn num_auths(&self) -> usize {
        self.account_auths.len() + self.key_auths.len()
    }

    pub fn total_weight(&self) -> u64 {
        self.account_auths
            .values()
            .chain(self.key_auths.values())
            .map(|w| u64::from(*w))
            .sum()
    }

    /// No combination of signers can ever reach the threshold.
    pub fn is_impossible(&self) -> bool {
        self.total_weight() < u64::from(self.weight_threshold)
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.weight_threshold == 0 {
            return Err(ProtocolError::InvalidAuthority("zero weight threshold".into()));
        }
        if self.account_auths.values().chain(self.key_auths.values()).any(|w| *w == 0) {
            return Err(ProtocolError::InvalidAuthority("zero weight entry".into()));
        }
        if self.is_impossible() {
            return Err(ProtocolError::InvalidAuthority(format!(
                "total weight {} below threshold {}",
                self.total_weight(),
                self.weight_threshold
            )));
        }
        Ok(())
    }
}

/// Which of an account's two authorities a requirement names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityClass {
    Active,
    Owner,
}

/// Authorities an operation needs before it may be applied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequiredAuthorities {
    pub active: BTreeSet<AccountId>,
    pub owner: BTreeSet<AccountId>,
    pub other: Vec<Authority>,
}

impl RequiredAuthorities {
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.owner.is_empty() && self.other.is_empty()
    }

    pub fn merge(&mut self, other: RequiredAuthorities) {
        self.active.extend(other.active);
        self.owner.extend(other.owner);
        self.other.extend(other.other);
    }
}
