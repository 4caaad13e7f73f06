//! # Operations
//!
//! The closed set of instructions a transaction may carry. Each payload
//! implements [`OperationPayload`]: a stateless `validate()`, its fee payer,
//! the authorities it needs and a fee formula over its own
//! [`OperationPayload::FeeParameters`].
//!
//! The [`Operation`] enum, the matching [`FeeParameters`] enum and the
//! [`OperationTag`] are generated together, so the wire tag (declaration
//! index) of an operation and of its fee parameters can never drift apart.

pub mod account;
pub mod asset_ops;
pub mod assert;
pub mod balance;
pub mod committee;
pub mod market;
pub mod proposal;
pub mod transfer;

pub use account::*;
pub use asset_ops::*;
pub use assert::*;
pub use balance::*;
pub use committee::*;
pub use market::*;
pub use proposal::*;
pub use transfer::*;

use crate::asset::Asset;
use crate::authority::RequiredAuthorities;
use crate::errors::ProtocolError;
use crate::ids::AccountId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Smallest unit count of one whole core token.
pub const BLOCKCHAIN_PRECISION: u64 = 100_000;

/// Behaviour shared by every operation payload.
pub trait OperationPayload: Clone + Debug + Serialize + DeserializeOwned + Into<Operation> {
    type FeeParameters: Clone + Debug + Default + Serialize + DeserializeOwned + Into<FeeParameters>;

    const NAME: &'static str;

    fn fee(&self) -> Asset;

    fn fee_mut(&mut self) -> &mut Asset;

    /// Account charged for this operation.
    fn fee_payer(&self) -> AccountId;

    /// Checks that need nothing but the operation itself.
    fn validate(&self) -> Result<(), ProtocolError>;

    /// Base fee in core units, before the schedule's scale.
    fn calculate_fee(&self, params: &Self::FeeParameters) -> Result<u64, ProtocolError>;

    fn required_authorities(&self, auths: &mut RequiredAuthorities);
}

/// Fee for `bytes` of payload at `price_per_kbyte`.
pub fn calculate_data_fee(bytes: u64, price_per_kbyte: u64) -> u64 {
    let fee = u128::from(bytes) * u128::from(price_per_kbyte) / 1024;
    u64::try_from(fee).unwrap_or(u64::MAX)
}

pub(crate) fn check(condition: bool, operation: &'static str, reason: &str) -> Result<(), ProtocolError> {
    if condition {
        Ok(())
    } else {
        Err(ProtocolError::InvalidOperation {
            operation,
            reason: reason.to_string(),
        })
    }
}

pub(crate) fn check_fee(fee: &Asset, operation: &'static str) -> Result<(), ProtocolError> {
    check(fee.amount >= 0, operation, "fee must be non-negative")
}

macro_rules! operation_set {
    ($($(#[$meta:meta])* $variant:ident($payload:ty, $params:ty)),+ $(,)?) => {
        /// A single typed instruction. The variant index is the wire tag.
        #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum Operation {
            $($(#[$meta])* $variant($payload)),+
        }

        /// Fee parameters, one variant per operation, same order.
        #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum FeeParameters {
            $($variant($params)),+
        }

        /// Runtime tag of an operation; the dispatch key of the evaluators.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(u8)]
        pub enum OperationTag {
            $($variant),+
        }

        impl OperationTag {
            pub const ALL: &'static [OperationTag] = &[$(OperationTag::$variant),+];

            pub fn index(self) -> usize {
                self as usize
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(OperationTag::$variant => <$payload as OperationPayload>::NAME),+
                }
            }
        }

        $(
            impl From<$payload> for Operation {
                fn from(op: $payload) -> Self {
                    Operation::$variant(op)
                }
            }

            impl From<$params> for FeeParameters {
                fn from(params: $params) -> Self {
                    FeeParameters::$variant(params)
                }
            }
        )+

        impl Operation {
            pub fn tag(&self) -> OperationTag {
                match self {
                    $(Operation::$variant(_) => OperationTag::$variant),+
                }
            }

            pub fn name(&self) -> &'static str {
                self.tag().name()
            }

            pub fn fee(&self) -> Asset {
                match self {
                    $(Operation::$variant(op) => op.fee()),+
                }
            }

            pub fn fee_mut(&mut self) -> &mut Asset {
                match self {
                    $(Operation::$variant(op) => op.fee_mut()),+
                }
            }

            pub fn fee_payer(&self) -> AccountId {
                match self {
                    $(Operation::$variant(op) => op.fee_payer()),+
                }
            }

            pub fn validate(&self) -> Result<(), ProtocolError> {
                match self {
                    $(Operation::$variant(op) => op.validate()),+
                }
            }

            pub fn required_authorities(&self, auths: &mut RequiredAuthorities) {
                match self {
                    $(Operation::$variant(op) => op.required_authorities(auths)),+
                }
            }

            /// Base fee using `params`, or the defaults if the schedule has
            /// no entry for this operation.
            pub fn calculate_fee(&self, params: Option<&FeeParameters>) -> Result<u64, ProtocolError> {
                match self {
                    $(Operation::$variant(op) => match params {
                        Some(FeeParameters::$variant(p)) => op.calculate_fee(p),
                        _ => op.calculate_fee(&<$params>::default()),
                    }),+
                }
            }
        }

        impl FeeParameters {
            pub fn tag(&self) -> OperationTag {
                match self {
                    $(FeeParameters::$variant(_) => OperationTag::$variant),+
                }
            }

            pub fn default_for(tag: OperationTag) -> FeeParameters {
                match tag {
                    $(OperationTag::$variant => FeeParameters::$variant(<$params>::default())),+
                }
            }
        }
    };
}

operation_set! {
    Transfer(TransferOperation, TransferFeeParameters),
    LimitOrderCreate(LimitOrderCreateOperation, LimitOrderCreateFeeParameters),
    LimitOrderCancel(LimitOrderCancelOperation, LimitOrderCancelFeeParameters),
    AccountCreate(AccountCreateOperation, AccountCreateFeeParameters),
    AccountUpdate(AccountUpdateOperation, AccountUpdateFeeParameters),
    AssetCreate(AssetCreateOperation, AssetCreateFeeParameters),
    AssetIssue(AssetIssueOperation, AssetIssueFeeParameters),
    AssetReserve(AssetReserveOperation, AssetReserveFeeParameters),
    AssetFundFeePool(AssetFundFeePoolOperation, AssetFundFeePoolFeeParameters),
    ProposalCreate(ProposalCreateOperation, ProposalCreateFeeParameters),
    ProposalUpdate(ProposalUpdateOperation, ProposalUpdateFeeParameters),
    ProposalDelete(ProposalDeleteOperation, ProposalDeleteFeeParameters),
    /// Only legal inside a proposal.
    CommitteeMemberUpdateGlobalParameters(
        CommitteeMemberUpdateGlobalParametersOperation,
        CommitteeMemberUpdateGlobalParametersFeeParameters
    ),
    Assert(AssertOperation, AssertFeeParameters),
    BalanceClaim(BalanceClaimOperation, BalanceClaimFeeParameters),
}
