//! Account registration and authority updates.

use super::{calculate_data_fee, check, check_fee, OperationPayload, BLOCKCHAIN_PRECISION};
use crate::asset::Asset;
use crate::authority::{Authority, RequiredAuthorities};
use crate::codec;
use crate::errors::ProtocolError;
use crate::ids::{AccountId, TEMP_ACCOUNT};
use crate::keys::PublicKey;
use serde::{Deserialize, Serialize};

pub const MIN_ACCOUNT_NAME_LENGTH: usize = 3;
pub const MAX_ACCOUNT_NAME_LENGTH: usize = 63;

/// Dot-separated labels of `[a-z0-9-]`, each starting with a letter and
/// ending with a letter or digit.
pub fn is_valid_name(name: &str) -> bool {
    if name.len() < MIN_ACCOUNT_NAME_LENGTH || name.len() > MAX_ACCOUNT_NAME_LENGTH {
        return false;
    }
    name.split('.').all(|label| {
        let bytes = label.as_bytes();
        match (bytes.first(), bytes.last()) {
            (Some(first), Some(last)) => {
                first.is_ascii_lowercase()
                    && (last.is_ascii_lowercase() || last.is_ascii_digit())
                    && bytes
                        .iter()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == b'-')
            }
            _ => false,
        }
    })
}

/// Names with a digit, a dash, a dot or no vowels pay the basic fee.
pub fn is_cheap_name(name: &str) -> bool {
    let has_vowel = name.chars().any(|c| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y'));
    let has_marker = name.chars().any(|c| c.is_ascii_digit() || c == '-' || c == '.');
    has_marker || !has_vowel
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreateOperation {
    pub fee: Asset,
    pub registrar: AccountId,
    pub name: String,
    pub owner: Authority,
    pub active: Authority,
    pub memo_key: PublicKey,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreateFeeParameters {
    pub basic_fee: u64,
    pub premium_fee: u64,
    pub price_per_kbyte: u64,
}

impl Default for AccountCreateFeeParameters {
    fn default() -> Self {
        Self {
            basic_fee: 5 * BLOCKCHAIN_PRECISION,
            premium_fee: 2000 * BLOCKCHAIN_PRECISION,
            price_per_kbyte: BLOCKCHAIN_PRECISION,
        }
    }
}

impl OperationPayload for AccountCreateOperation {
    type FeeParameters = AccountCreateFeeParameters;

    const NAME: &'static str = "account_create";

    fn fee(&self) -> Asset {
        self.fee
    }

    fn fee_mut(&mut self) -> &mut Asset {
        &mut self.fee
    }

    fn fee_payer(&self) -> AccountId {
        self.registrar
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        check_fee(&self.fee, Self::NAME)?;
        check(is_valid_name(&self.name), Self::NAME, "invalid account name")?;
        check(self.owner.num_auths() != 0, Self::NAME, "owner authority is empty")?;
        check(self.active.num_auths() != 0, Self::NAME, "active authority is empty")?;
        self.owner.validate()?;
        self.active.validate()
    }

    fn calculate_fee(&self, params: &Self::FeeParameters) -> Result<u64, ProtocolError> {
        let base = if is_cheap_name(&self.name) {
            params.basic_fee
        } else {
            params.premium_fee
        };
        let data = calculate_data_fee(codec::packed_size(self)?, params.price_per_kbyte);
        Ok(base.saturating_add(data))
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.insert(self.registrar);
    }
}

/// Replaces any subset of an account's authorities and memo key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdateOperation {
    pub fee: Asset,
    pub account: AccountId,
    pub owner: Option<Authority>,
    pub active: Option<Authority>,
    pub new_memo_key: Option<PublicKey>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdateFeeParameters {
    pub fee: u64,
    pub price_per_kbyte: u64,
}

impl Default for AccountUpdateFeeParameters {
    fn default() -> Self {
        Self {
            fee: 20 * BLOCKCHAIN_PRECISION,
            price_per_kbyte: 10 * BLOCKCHAIN_PRECISION,
        }
    }
}

impl OperationPayload for AccountUpdateOperation {
    type FeeParameters = AccountUpdateFeeParameters;

    const NAME: &'static str = "account_update";

    fn fee(&self) -> Asset {
        self.fee
    }

    fn fee_mut(&mut self) -> &mut Asset {
        &mut self.fee
    }

    fn fee_payer(&self) -> AccountId {
        self.account
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        check_fee(&self.fee, Self::NAME)?;
        check(self.account != TEMP_ACCOUNT, Self::NAME, "cannot update the temp account")?;
        check(
            self.owner.is_some() || self.active.is_some() || self.new_memo_key.is_some(),
            Self::NAME,
            "nothing to update",
        )?;
        if let Some(owner) = &self.owner {
            check(owner.num_auths() != 0, Self::NAME, "owner authority is empty")?;
            owner.validate()?;
        }
        if let Some(active) = &self.active {
            check(active.num_auths() != 0, Self::NAME, "active authority is empty")?;
            active.validate()?;
        }
        Ok(())
    }

    fn calculate_fee(&self, params: &Self::FeeParameters) -> Result<u64, ProtocolError> {
        let data = calculate_data_fee(codec::packed_size(self)?, params.price_per_kbyte);
        Ok(params.fee.saturating_add(data))
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        if self.owner.is_some() {
            auths.owner.insert(self.account);
        } else {
            auths.active.insert(self.account);
        }
    }
}
