//! User-issued assets: creation, issuance, reservation and fee pools.

use super::{calculate_data_fee, check, check_fee, Memo, OperationPayload, BLOCKCHAIN_PRECISION};
use crate::asset::{Asset, Price, ShareType, MAX_SHARE_SUPPLY};
use crate::authority::RequiredAuthorities;
use crate::codec;
use crate::errors::ProtocolError;
use crate::ids::{AccountId, AssetId, CORE_ASSET};
use serde::{Deserialize, Serialize};

pub const MIN_ASSET_SYMBOL_LENGTH: usize = 3;
pub const MAX_ASSET_SYMBOL_LENGTH: usize = 16;
pub const MAX_ASSET_PRECISION: u8 = 12;

/// Issuer may restrict transfers to those involving the issuer.
pub const TRANSFER_RESTRICTED: u16 = 0x01;
/// Issuer may transfer or reserve on behalf of holders.
pub const OVERRIDE_AUTHORITY: u16 = 0x02;
pub const ASSET_ISSUER_PERMISSION_MASK: u16 = TRANSFER_RESTRICTED | OVERRIDE_AUTHORITY;

/// `A-Z` and digits, one optional inner dot, starting with a letter.
pub fn is_valid_symbol(symbol: &str) -> bool {
    let bytes = symbol.as_bytes();
    if bytes.len() < MIN_ASSET_SYMBOL_LENGTH || bytes.len() > MAX_ASSET_SYMBOL_LENGTH {
        return false;
    }
    let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
    if !first.is_ascii_uppercase() || !(last.is_ascii_uppercase() || last.is_ascii_digit()) {
        return false;
    }
    let dots = bytes.iter().filter(|c| **c == b'.').count();
    dots <= 1
        && bytes
            .iter()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == b'.')
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetOptions {
    pub max_supply: ShareType,
    /// Price of the asset in core units. The quote side is core; the base
    /// side is rewritten to the new asset's id on creation.
    pub core_exchange_rate: Price,
    pub issuer_permissions: u16,
    pub flags: u16,
}

impl AssetOptions {
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.max_supply <= 0 || self.max_supply > MAX_SHARE_SUPPLY {
            return Err(ProtocolError::InvalidOperation {
                operation: "asset_options",
                reason: format!("max_supply {} out of range", self.max_supply),
            });
        }
        if self.issuer_permissions & !ASSET_ISSUER_PERMISSION_MASK != 0
            || self.flags & !self.issuer_permissions != 0
        {
            return Err(ProtocolError::InvalidOperation {
                operation: "asset_options",
                reason: "flags exceed issuer permissions".into(),
            });
        }
        if self.core_exchange_rate.quote.asset_id != CORE_ASSET {
            return Err(ProtocolError::InvalidPrice(
                "core exchange rate must be quoted against the core asset".into(),
            ));
        }
        self.core_exchange_rate.validate()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCreateOperation {
    pub fee: Asset,
    pub issuer: AccountId,
    pub symbol: String,
    pub precision: u8,
    pub common_options: AssetOptions,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCreateFeeParameters {
    pub symbol3: u64,
    pub symbol4: u64,
    pub long_symbol: u64,
    pub price_per_kbyte: u64,
}

impl Default for AssetCreateFeeParameters {
    fn default() -> Self {
        Self {
            symbol3: 500_000 * BLOCKCHAIN_PRECISION,
            symbol4: 300_000 * BLOCKCHAIN_PRECISION,
            long_symbol: 5000 * BLOCKCHAIN_PRECISION,
            price_per_kbyte: 10 * BLOCKCHAIN_PRECISION,
        }
    }
}

impl OperationPayload for AssetCreateOperation {
    type FeeParameters = AssetCreateFeeParameters;

    const NAME: &'static str = "asset_create";

    fn fee(&self) -> Asset {
        self.fee
    }

    fn fee_mut(&mut self) -> &mut Asset {
        &mut self.fee
    }

    fn fee_payer(&self) -> AccountId {
        self.issuer
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        check_fee(&self.fee, Self::NAME)?;
        check(is_valid_symbol(&self.symbol), Self::NAME, "invalid asset symbol")?;
        check(self.precision <= MAX_ASSET_PRECISION, Self::NAME, "precision too large")?;
        self.common_options.validate()
    }

    fn calculate_fee(&self, params: &Self::FeeParameters) -> Result<u64, ProtocolError> {
        let base = match self.symbol.len() {
            3 => params.symbol3,
            4 => params.symbol4,
            _ => params.long_symbol,
        };
        let data = calculate_data_fee(codec::packed_size(self)?, params.price_per_kbyte);
        Ok(base.saturating_add(data))
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.insert(self.issuer);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetIssueOperation {
    pub fee: Asset,
    pub issuer: AccountId,
    pub asset_to_issue: Asset,
    pub issue_to_account: AccountId,
    pub memo: Option<Memo>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetIssueFeeParameters {
    pub fee: u64,
    pub price_per_kbyte: u64,
}

impl Default for AssetIssueFeeParameters {
    fn default() -> Self {
        Self {
            fee: 20 * BLOCKCHAIN_PRECISION,
            price_per_kbyte: BLOCKCHAIN_PRECISION,
        }
    }
}

impl OperationPayload for AssetIssueOperation {
    type FeeParameters = AssetIssueFeeParameters;

    const NAME: &'static str = "asset_issue";

    fn fee(&self) -> Asset {
        self.fee
    }

    fn fee_mut(&mut self) -> &mut Asset {
        &mut self.fee
    }

    fn fee_payer(&self) -> AccountId {
        self.issuer
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        check_fee(&self.fee, Self::NAME)?;
        check(self.asset_to_issue.asset_id != CORE_ASSET, Self::NAME, "cannot issue the core asset")?;
        check(
            self.asset_to_issue.amount > 0 && self.asset_to_issue.amount <= MAX_SHARE_SUPPLY,
            Self::NAME,
            "amount out of range",
        )
    }

    fn calculate_fee(&self, params: &Self::FeeParameters) -> Result<u64, ProtocolError> {
        let mut fee = params.fee;
        if let Some(memo) = &self.memo {
            fee = fee.saturating_add(calculate_data_fee(
                codec::packed_size(memo)?,
                params.price_per_kbyte,
            ));
        }
        Ok(fee)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.insert(self.issuer);
    }
}

/// Burns units held by `payer`, shrinking the current supply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReserveOperation {
    pub fee: Asset,
    pub payer: AccountId,
    pub amount_to_reserve: Asset,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReserveFeeParameters {
    pub fee: u64,
}

impl Default for AssetReserveFeeParameters {
    fn default() -> Self {
        Self {
            fee: 20 * BLOCKCHAIN_PRECISION,
        }
    }
}

impl OperationPayload for AssetReserveOperation {
    type FeeParameters = AssetReserveFeeParameters;

    const NAME: &'static str = "asset_reserve";

    fn fee(&self) -> Asset {
        self.fee
    }

    fn fee_mut(&mut self) -> &mut Asset {
        &mut self.fee
    }

    fn fee_payer(&self) -> AccountId {
        self.payer
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        check_fee(&self.fee, Self::NAME)?;
        check(self.amount_to_reserve.asset_id != CORE_ASSET, Self::NAME, "cannot reserve the core asset")?;
        check(
            self.amount_to_reserve.amount > 0 && self.amount_to_reserve.amount <= MAX_SHARE_SUPPLY,
            Self::NAME,
            "amount out of range",
        )
    }

    fn calculate_fee(&self, params: &Self::FeeParameters) -> Result<u64, ProtocolError> {
        Ok(params.fee)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.insert(self.payer);
    }
}

/// Moves core units into an asset's fee pool, which converts fees paid in
/// that asset into core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFundFeePoolOperation {
    pub fee: Asset,
    pub from_account: AccountId,
    pub asset_id: AssetId,
    /// Core units.
    pub amount: ShareType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFundFeePoolFeeParameters {
    pub fee: u64,
}

impl Default for AssetFundFeePoolFeeParameters {
    fn default() -> Self {
        Self {
            fee: BLOCKCHAIN_PRECISION,
        }
    }
}

impl OperationPayload for AssetFundFeePoolOperation {
    type FeeParameters = AssetFundFeePoolFeeParameters;

    const NAME: &'static str = "asset_fund_fee_pool";

    fn fee(&self) -> Asset {
        self.fee
    }

    fn fee_mut(&mut self) -> &mut Asset {
        &mut self.fee
    }

    fn fee_payer(&self) -> AccountId {
        self.from_account
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        check_fee(&self.fee, Self::NAME)?;
        check(self.fee.asset_id == CORE_ASSET, Self::NAME, "fee must be paid in the core asset")?;
        check(
            self.amount > 0 && self.amount <= MAX_SHARE_SUPPLY,
            Self::NAME,
            "amount out of range",
        )
    }

    fn calculate_fee(&self, params: &Self::FeeParameters) -> Result<u64, ProtocolError> {
        Ok(params.fee)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.insert(self.from_account);
    }
}
