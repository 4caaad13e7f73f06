//! # Amounts and Prices
//!
//! `Asset` is an amount tagged with the asset it counts. `Price` is a ratio
//! between two assets; converting through a price uses 128-bit
//! intermediates and either rounds down (market conversion) or up (fee
//! conversion, so the payer never underpays).

use crate::errors::ProtocolError;
use crate::ids::{AssetId, CORE_ASSET};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Signed amount of some asset, in its smallest unit.
pub type ShareType = i64;

/// No asset may ever exceed this supply; fees and amounts are capped by it.
pub const MAX_SHARE_SUPPLY: ShareType = 1_000_000_000_000_000;

/// 100% expressed in basis points.
pub const PERCENT_100: u32 = 10_000;

/// An amount of one asset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub amount: ShareType,
    pub asset_id: AssetId,
}

impl Asset {
    pub const fn new(amount: ShareType, asset_id: AssetId) -> Self {
        Self { amount, asset_id }
    }

    /// An amount of the core asset.
    pub const fn core(amount: ShareType) -> Self {
        Self::new(amount, CORE_ASSET)
    }

    pub fn checked_add(&self, other: &Asset) -> Result<Asset, ProtocolError> {
        self.ensure_same_asset(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(ProtocolError::Overflow("asset addition"))?;
        Ok(Asset::new(amount, self.asset_id))
    }

    pub fn checked_sub(&self, other: &Asset) -> Result<Asset, ProtocolError> {
        self.ensure_same_asset(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(ProtocolError::Overflow("asset subtraction"))?;
        Ok(Asset::new(amount, self.asset_id))
    }

    fn ensure_same_asset(&self, other: &Asset) -> Result<(), ProtocolError> {
        if self.asset_id != other.asset_id {
            return Err(ProtocolError::AssetMismatch {
                expected: self.asset_id.to_string(),
                actual: other.asset_id.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.asset_id)
    }
}

/// `base` units of one asset trade for `quote` units of another.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Price {
    pub base: Asset,
    pub quote: Asset,
}

impl Price {
    pub const fn new(base: Asset, quote: Asset) -> Self {
        Self { base, quote }
    }

    /// Identity price of an asset against itself.
    pub const fn unit_price(asset_id: AssetId) -> Self {
        Self::new(Asset::new(1, asset_id), Asset::new(1, asset_id))
    }

    pub fn is_null(&self) -> bool {
        self.base.amount == 0 && self.quote.amount == 0
    }

    pub fn invert(&self) -> Price {
        Price::new(self.quote, self.base)
    }

    /// Both sides positive and of different assets.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.base.amount <= 0 || self.quote.amount <= 0 {
            return Err(ProtocolError::InvalidPrice(format!(
                "non-positive side in {} / {}",
                self.base, self.quote
            )));
        }
        if self.base.asset_id == self.quote.asset_id {
            return Err(ProtocolError::InvalidPrice(format!(
                "base and quote are both {}",
                self.base.asset_id
            )));
        }
        Ok(())
    }

    /// Converts `amount` to the other side of the price, rounding down.
    pub fn convert(&self, amount: &Asset) -> Result<Asset, ProtocolError> {
        self.convert_with(amount, false)
    }

    /// Converts `amount` to the other side of the price, rounding up.
    pub fn multiply_and_round_up(&self, amount: &Asset) -> Result<Asset, ProtocolError> {
        self.convert_with(amount, true)
    }

    fn convert_with(&self, amount: &Asset, round_up: bool) -> Result<Asset, ProtocolError> {
        let (from, to) = if amount.asset_id == self.base.asset_id {
            (self.base, self.quote)
        } else if amount.asset_id == self.quote.asset_id {
            (self.quote, self.base)
        } else {
            return Err(ProtocolError::AssetMismatch {
                expected: format!("{} or {}", self.base.asset_id, self.quote.asset_id),
                actual: amount.asset_id.to_string(),
            });
        };
        if from.amount <= 0 || to.amount < 0 || amount.amount < 0 {
            return Err(ProtocolError::InvalidPrice(format!(
                "cannot convert {} through {} / {}",
                amount, self.base, self.quote
            )));
        }
        let numerator = amount.amount as u128 * to.amount as u128;
        let denominator = from.amount as u128;
        let mut result = numerator / denominator;
        if round_up && numerator % denominator != 0 {
            result += 1;
        }
        if result > MAX_SHARE_SUPPLY as u128 {
            return Err(ProtocolError::Overflow("price conversion"));
        }
        Ok(Asset::new(result as ShareType, to.asset_id))
    }

    /// Compares two prices of the same market as `quote / base` ratios.
    pub fn compare(&self, other: &Price) -> Option<Ordering> {
        if self.base.asset_id != other.base.asset_id || self.quote.asset_id != other.quote.asset_id {
            return None;
        }
        let lhs = self.quote.amount as i128 * other.base.amount as i128;
        let rhs = other.quote.amount as i128 * self.base.amount as i128;
        Some(lhs.cmp(&rhs))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.base, self.quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd() -> AssetId {
        AssetId(1)
    }

    #[test]
    fn test_convert_rounds_down_and_up() {
        // 3 USD buy 10 CORE
        let price = Price::new(Asset::new(3, usd()), Asset::core(10));
        assert_eq!(price.convert(&Asset::core(5)).unwrap(), Asset::new(1, usd()));
        assert_eq!(
            price.multiply_and_round_up(&Asset::core(5)).unwrap(),
            Asset::new(2, usd())
        );
        assert_eq!(price.convert(&Asset::new(3, usd())).unwrap(), Asset::core(10));
    }

    #[test]
    fn test_unit_price_is_identity() {
        let price = Price::unit_price(CORE_ASSET);
        assert_eq!(price.convert(&Asset::core(1234)).unwrap(), Asset::core(1234));
    }

    #[test]
    fn test_convert_rejects_foreign_asset() {
        let price = Price::new(Asset::new(1, usd()), Asset::core(1));
        assert!(matches!(
            price.convert(&Asset::new(1, AssetId(9))),
            Err(ProtocolError::AssetMismatch { .. })
        ));
    }

    #[test]
    fn test_convert_guards_max_supply() {
        let price = Price::new(Asset::new(1, usd()), Asset::core(MAX_SHARE_SUPPLY));
        assert!(matches!(
            price.convert(&Asset::new(2, usd())),
            Err(ProtocolError::Overflow(_))
        ));
    }

    #[test]
    fn test_validate() {
        assert!(Price::new(Asset::new(1, usd()), Asset::core(2)).validate().is_ok());
        assert!(Price::new(Asset::new(0, usd()), Asset::core(2)).validate().is_err());
        assert!(Price::unit_price(CORE_ASSET).validate().is_err());
    }

    #[test]
    fn test_compare_within_market() {
        let cheap = Price::new(Asset::new(10, usd()), Asset::core(1));
        let dear = Price::new(Asset::new(10, usd()), Asset::core(2));
        assert_eq!(cheap.compare(&dear), Some(Ordering::Less));
        assert_eq!(cheap.compare(&cheap.invert()), None);
    }

    #[test]
    fn test_checked_add_requires_same_asset() {
        assert_eq!(
            Asset::core(1).checked_add(&Asset::core(2)).unwrap(),
            Asset::core(3)
        );
        assert!(Asset::core(1).checked_add(&Asset::new(2, usd())).is_err());
    }
}
