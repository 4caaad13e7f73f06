//! # Authority Verification
//!
//! Walks the weighted-threshold graph of accounts and keys against the keys
//! that signed a transaction.
//!
//! ## Rules
//!
//! - A key counts once it appears among the provided keys; counting marks
//!   it used.
//! - A sub-account counts with its weight if its **active** authority is
//!   satisfied one level deeper. Levels beyond `max_depth` are not walked.
//! - Satisfied `(account, class)` pairs are memoised in `approved_by` for
//!   the rest of the transaction. An owner approval implies active.
//! - A required active authority at the top level may also be satisfied by
//!   the account's owner authority.

use crate::errors::ChainError;
use shared_types::{
    AccountId, Authority, AuthorityClass, PublicKey, RequiredAuthorities, COMMITTEE_ACCOUNT,
};
use std::collections::{BTreeMap, BTreeSet};

/// Read access to account authorities.
pub trait AuthorityLookup {
    fn authority(&self, account: AccountId, class: AuthorityClass) -> Option<&Authority>;
}

#[derive(Debug, Clone, Default)]
pub struct SignState {
    /// Provided keys and whether an authority check consumed them.
    provided: BTreeMap<PublicKey, bool>,
    approved_by: BTreeSet<(AccountId, AuthorityClass)>,
    max_depth: u8,
    depth_exceeded: bool,
}

impl SignState {
    pub fn new(keys: impl IntoIterator<Item = PublicKey>, max_depth: u8) -> Self {
        Self {
            provided: keys.into_iter().map(|key| (key, false)).collect(),
            approved_by: BTreeSet::new(),
            max_depth,
            depth_exceeded: false,
        }
    }

    /// Seeds approvals granted outside of signatures, e.g. on a proposal.
    pub fn with_approvals(
        mut self,
        active: impl IntoIterator<Item = AccountId>,
        owner: impl IntoIterator<Item = AccountId>,
    ) -> Self {
        self.approved_by
            .extend(active.into_iter().map(|id| (id, AuthorityClass::Active)));
        self.approved_by
            .extend(owner.into_iter().map(|id| (id, AuthorityClass::Owner)));
        self
    }

    /// Whether `key` was provided. Marks it used.
    pub fn signed_by(&mut self, key: &PublicKey) -> bool {
        match self.provided.get_mut(key) {
            Some(used) => {
                *used = true;
                true
            }
            None => false,
        }
    }

    pub fn is_approved(&self, account: AccountId, class: AuthorityClass) -> bool {
        self.approved_by.contains(&(account, class))
            || (class == AuthorityClass::Active
                && self.approved_by.contains(&(account, AuthorityClass::Owner)))
    }

    pub fn check_authority<L: AuthorityLookup + ?Sized>(
        &mut self,
        authority: &Authority,
        lookup: &L,
        depth: u8,
    ) -> bool {
        let threshold = u64::from(authority.weight_threshold);
        let mut total = 0u64;
        if total >= threshold {
            return true;
        }
        for (key, weight) in &authority.key_auths {
            if self.signed_by(key) {
                total += u64::from(*weight);
                if total >= threshold {
                    return true;
                }
            }
        }
        for (account, weight) in &authority.account_auths {
            let satisfied = if self.is_approved(*account, AuthorityClass::Active) {
                true
            } else if depth >= self.max_depth {
                self.depth_exceeded = true;
                false
            } else {
                self.check_account_authority(*account, AuthorityClass::Active, lookup, depth + 1)
            };
            if satisfied {
                total += u64::from(*weight);
                if total >= threshold {
                    return true;
                }
            }
        }
        false
    }

    /// Checks one account's authority of `class` and memoises success.
    fn check_account_authority<L: AuthorityLookup + ?Sized>(
        &mut self,
        account: AccountId,
        class: AuthorityClass,
        lookup: &L,
        depth: u8,
    ) -> bool {
        let Some(authority) = lookup.authority(account, class) else {
            return false;
        };
        if self.check_authority(authority, lookup, depth) {
            self.approved_by.insert((account, class));
            true
        } else {
            false
        }
    }

    /// Top-level check of a required account authority. Depth tracking
    /// starts over for each required authority.
    pub fn check_account<L: AuthorityLookup + ?Sized>(
        &mut self,
        account: AccountId,
        class: AuthorityClass,
        lookup: &L,
    ) -> bool {
        self.depth_exceeded = false;
        if self.is_approved(account, class) {
            return true;
        }
        match class {
            AuthorityClass::Active => {
                self.check_account_authority(account, AuthorityClass::Active, lookup, 0)
                    || self.check_account_authority(account, AuthorityClass::Owner, lookup, 0)
            }
            AuthorityClass::Owner => {
                self.check_account_authority(account, AuthorityClass::Owner, lookup, 0)
            }
        }
    }

    /// Verifies every authority in `required`. The committee account may
    /// only be required when `allow_committee` is set.
    pub fn verify<L: AuthorityLookup + ?Sized>(
        &mut self,
        required: &RequiredAuthorities,
        lookup: &L,
        allow_committee: bool,
    ) -> Result<(), ChainError> {
        if !allow_committee
            && (required.active.contains(&COMMITTEE_ACCOUNT)
                || required.owner.contains(&COMMITTEE_ACCOUNT))
        {
            return Err(ChainError::CommitteeOutsideProposal);
        }
        for account in &required.active {
            if !self.check_account(*account, AuthorityClass::Active, lookup) {
                return Err(self.missing(*account, AuthorityClass::Active));
            }
        }
        for account in &required.owner {
            if !self.check_account(*account, AuthorityClass::Owner, lookup) {
                return Err(self.missing(*account, AuthorityClass::Owner));
            }
        }
        for authority in &required.other {
            self.depth_exceeded = false;
            if !self.check_authority(authority, lookup, 0) {
                return Err(if self.depth_exceeded {
                    ChainError::AuthorityDepthExceeded {
                        max_depth: self.max_depth,
                    }
                } else {
                    ChainError::MissingOtherAuthority
                });
            }
        }
        Ok(())
    }

    fn missing(&self, account: AccountId, class: AuthorityClass) -> ChainError {
        if self.depth_exceeded {
            ChainError::AuthorityDepthExceeded {
                max_depth: self.max_depth,
            }
        } else {
            ChainError::MissingAuthority { account, class }
        }
    }

    /// Provided keys no authority check consumed.
    pub fn unused_keys(&self) -> impl Iterator<Item = PublicKey> + '_ {
        self.provided
            .iter()
            .filter(|(_, used)| !**used)
            .map(|(key, _)| *key)
    }

    pub fn provided_keys(&self) -> impl Iterator<Item = PublicKey> + '_ {
        self.provided.keys().copied()
    }
}
