//! # Chain Errors
//!
//! Every rejection carries enough context to explain itself. [`ErrorKind`]
//! sorts them into the three classes the node reacts to differently:
//!
//! | Kind | Meaning | Node reaction |
//! |------|---------|---------------|
//! | `Validation` | data-dependent, expected | reject the transaction/block |
//! | `Resource` | attacker-triggerable limit | reject the transaction/block |
//! | `Fatal` | inconsistent state or misuse | halt until state is rebuilt |

use crate::ports::SnapshotError;
use ledger_object_store::DbError;
use shared_types::{
    AccountId, AssetId, AuthorityClass, BlockId, ObjectId, ProtocolError, PublicKey, ShareType,
    TimePointSec,
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Resource,
    Fatal,
}

impl ErrorKind {
    /// Metric label.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Resource => "resource",
            ErrorKind::Fatal => "fatal",
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Database(#[from] DbError),

    /// Failure of one operation inside a transaction.
    #[error("Operation {index} ({operation}) rejected: {source}")]
    Operation {
        index: usize,
        operation: &'static str,
        #[source]
        source: Box<ChainError>,
    },

    /// Failure of one transaction inside a block.
    #[error("Transaction {index} of block {block_num} rejected: {source}")]
    BlockTransaction {
        block_num: u32,
        index: usize,
        #[source]
        source: Box<ChainError>,
    },

    /// An operation failed after every operation evaluated successfully.
    #[error("Apply of operation {index} ({operation}) failed: {source}")]
    ApplyFailed {
        index: usize,
        operation: &'static str,
        #[source]
        source: Box<ChainError>,
    },

    #[error("Database halted after a fatal error: {0}")]
    Halted(String),

    /// Internal invariant broken; never caused by user data alone.
    #[error("Inconsistent state: {0}")]
    Inconsistent(String),

    // =========================================================================
    // TRANSACTION
    // =========================================================================
    #[error("Transaction of {size} bytes exceeds limit of {limit}")]
    TransactionTooLarge { size: u64, limit: u32 },

    #[error("Duplicate transaction {0}")]
    DuplicateTransaction(String),

    #[error("Transaction expired at {expiration}, head time is {now}")]
    Expired {
        expiration: TimePointSec,
        now: TimePointSec,
    },

    #[error("Transaction expiration {expiration} is beyond {max}")]
    ExpirationTooFar {
        expiration: TimePointSec,
        max: TimePointSec,
    },

    #[error("Transaction references unknown block {ref_block_num}/{ref_block_prefix}")]
    TaposMismatch {
        ref_block_num: u16,
        ref_block_prefix: u32,
    },

    #[error("Invalid signature by key {0}")]
    InvalidSignature(PublicKey),

    #[error("Key {0} signed the transaction twice")]
    DuplicateSignature(PublicKey),

    #[error("Signature by key {0} is not needed by any authority")]
    IrrelevantSignature(PublicKey),

    // =========================================================================
    // AUTHORITY
    // =========================================================================
    #[error("Missing {class:?} authority of account {account}")]
    MissingAuthority {
        account: AccountId,
        class: AuthorityClass,
    },

    #[error("Missing authority required by the operation itself")]
    MissingOtherAuthority,

    #[error("Authority check exceeded the maximum depth of {max_depth}")]
    AuthorityDepthExceeded { max_depth: u8 },

    #[error("The committee account may only act through proposals")]
    CommitteeOutsideProposal,

    #[error("Authority with {members} members exceeds limit of {limit}")]
    AuthorityTooLarge { members: usize, limit: u16 },

    #[error("Account {account} may not act on {object}")]
    Unauthorized { account: AccountId, object: ObjectId },

    // =========================================================================
    // FEES AND BALANCES
    // =========================================================================
    #[error("Insufficient fee: paid {paid}, required {required}")]
    InsufficientFee {
        paid: shared_types::Asset,
        required: shared_types::Asset,
    },

    #[error("Account {account} holds {balance} of {asset}, needs {required}")]
    InsufficientBalance {
        account: AccountId,
        asset: AssetId,
        balance: ShareType,
        required: ShareType,
    },

    #[error("Fee pool of {asset} holds {pool}, needs {required}")]
    InsufficientFeePool {
        asset: AssetId,
        pool: ShareType,
        required: ShareType,
    },

    // =========================================================================
    // OPERATION RULES
    // =========================================================================
    #[error("Account name {0} is already taken")]
    NameTaken(String),

    #[error("Asset symbol {0} is already taken")]
    SymbolTaken(String),

    #[error("Asset {0} is transfer restricted")]
    TransferRestricted(AssetId),

    #[error("Issuing {amount} of {asset} exceeds max supply {max_supply}")]
    MaxSupplyExceeded {
        asset: AssetId,
        amount: ShareType,
        max_supply: ShareType,
    },

    #[error("Object {0} was already consumed by an earlier operation")]
    AlreadyConsumed(ObjectId),

    #[error("{0} is only legal inside a proposal")]
    ProposalOnly(&'static str),

    #[error("Proposal nesting depth {depth} exceeds limit of {limit}")]
    ProposalNestingTooDeep { depth: u32, limit: u32 },

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Invalid balance claim: {0}")]
    InvalidBalanceClaim(String),

    #[error("Predicate {index} failed: {reason}")]
    PredicateFailed { index: usize, reason: String },

    #[error("Predicate opcode {opcode} exceeds maximum {max}")]
    UnknownPredicate { opcode: u8, max: u8 },

    #[error("Predicate of {size} bytes exceeds limit of {limit}")]
    PredicateTooLarge { size: u64, limit: u32 },

    #[error("{0}")]
    Rejected(String),

    // =========================================================================
    // BLOCKS
    // =========================================================================
    #[error("Block does not link to head {head}: previous is {previous}")]
    UnlinkableBlock { head: BlockId, previous: BlockId },

    #[error("Block timestamp {timestamp} is not after head time {head_time}")]
    InvalidBlockTimestamp {
        timestamp: TimePointSec,
        head_time: TimePointSec,
    },

    #[error("Block merkle root does not match its transactions")]
    MerkleMismatch,

    #[error("Block of {size} bytes exceeds limit of {limit}")]
    BlockTooLarge { size: u64, limit: u32 },

    #[error("No block to pop")]
    NothingToPop,

    #[error("Fork point {0} is not among the reversible blocks")]
    UnknownForkPoint(BlockId),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl ChainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChainError::Operation { source, .. } | ChainError::BlockTransaction { source, .. } => {
                source.kind()
            }
            ChainError::Database(err) if err.is_fatal() => ErrorKind::Fatal,
            ChainError::ApplyFailed { .. } | ChainError::Halted(_) | ChainError::Inconsistent(_) => {
                ErrorKind::Fatal
            }
            ChainError::AuthorityDepthExceeded { .. }
            | ChainError::TransactionTooLarge { .. }
            | ChainError::BlockTooLarge { .. }
            | ChainError::PredicateTooLarge { .. }
            | ChainError::UnknownPredicate { .. }
            | ChainError::ProposalNestingTooDeep { .. }
            | ChainError::Snapshot(_) => ErrorKind::Resource,
            _ => ErrorKind::Validation,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }

    /// Innermost error, looking through operation and transaction wrappers.
    pub fn root(&self) -> &ChainError {
        match self {
            ChainError::Operation { source, .. }
            | ChainError::BlockTransaction { source, .. }
            | ChainError::ApplyFailed { source, .. } => source.root(),
            other => other,
        }
    }
}
