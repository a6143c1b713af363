//! Error types for the VaultClear settlement core.
//!
//! All errors use the `VC_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Authorization errors
//! - 2xx: Asset / balance errors
//! - 3xx: Batch lifecycle errors
//! - 4xx: Settlement / proposal errors
//! - 5xx: Request errors
//! - 6xx: Receiver / escrow errors
//! - 7xx: Invariant errors
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{AccountId, BatchId, BatchStatus, ProposalId, ProposalStatus, RequestId, RequestStatus};

/// Central error enum for all VaultClear operations.
#[derive(Debug, Error)]
pub enum VaultclearError {
    // =================================================================
    // Authorization Errors (1xx)
    // =================================================================
    /// The caller lacks the capability required for this operation.
    #[error("VC_ERR_100: Unauthorized: missing capability {capability}")]
    Unauthorized { capability: String },

    // =================================================================
    // Asset / Balance Errors (2xx)
    // =================================================================
    /// The asset has not been registered with the ledger.
    #[error("VC_ERR_200: Asset not supported: {0}")]
    AssetNotSupported(String),

    /// A withdrawal request would exceed settled + deposited balance.
    #[error("VC_ERR_201: Insufficient virtual balance: need {needed}, have {available}")]
    InsufficientVirtualBalance { needed: Decimal, available: Decimal },

    /// A balance operation would produce a negative value.
    #[error("VC_ERR_202: Balance underflow")]
    BalanceUnderflow,

    /// A zero or negative amount was supplied where a positive one is required.
    #[error("VC_ERR_203: Invalid amount: {0}")]
    InvalidAmount(Decimal),

    // =================================================================
    // Batch Lifecycle Errors (3xx)
    // =================================================================
    /// The batch is in the wrong lifecycle state for the requested transition.
    #[error("VC_ERR_300: Batch {batch} is {actual}, expected {expected}")]
    BatchStateError {
        batch: BatchId,
        expected: BatchStatus,
        actual: BatchStatus,
    },

    /// An ACTIVE batch already exists for this (account, asset).
    #[error("VC_ERR_301: Batch already active for account {account} asset {asset}")]
    BatchAlreadyActive { account: AccountId, asset: String },

    /// The requested batch was not found.
    #[error("VC_ERR_302: Batch not found: {0}")]
    BatchNotFound(BatchId),

    // =================================================================
    // Settlement / Proposal Errors (4xx)
    // =================================================================
    /// A PENDING proposal already exists for this (account, batch).
    #[error("VC_ERR_400: Proposal conflict: batch {batch} already has pending proposal {existing}")]
    ProposalConflict {
        batch: BatchId,
        existing: ProposalId,
    },

    /// Execution attempted before the cooldown window elapsed.
    #[error("VC_ERR_401: Cooldown not elapsed: executable after {execute_after}")]
    CooldownNotElapsed {
        execute_after: chrono::DateTime<chrono::Utc>,
    },

    /// The proposed yield breaches the configured tolerance ceiling.
    #[error(
        "VC_ERR_402: Yield tolerance exceeded: |{yield_delta}| > {tolerance_bps}bps of {last_total}"
    )]
    YieldToleranceExceeded {
        yield_delta: Decimal,
        last_total: Decimal,
        tolerance_bps: u32,
    },

    /// The proposal is in the wrong lifecycle state for the operation.
    #[error("VC_ERR_403: Proposal {proposal} is {actual}: {reason}")]
    ProposalStateError {
        proposal: ProposalId,
        actual: ProposalStatus,
        reason: String,
    },

    /// The requested proposal was not found.
    #[error("VC_ERR_404: Proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    /// The batch's pending balances moved after the proposal snapshot.
    #[error("VC_ERR_405: Batch {0} mutated since proposal snapshot")]
    BatchMutatedSinceProposal(BatchId),

    /// The account's settled balance moved after the proposal snapshot.
    #[error(
        "VC_ERR_406: Proposal {proposal} is stale: settled balance was {snapshot}, now {actual}"
    )]
    SettledBalanceChanged {
        proposal: ProposalId,
        snapshot: Decimal,
        actual: Decimal,
    },

    // =================================================================
    // Request Errors (5xx)
    // =================================================================
    /// The request is in the wrong lifecycle state for the operation.
    #[error("VC_ERR_500: Request {request} is {actual}: {reason}")]
    RequestStateError {
        request: RequestId,
        actual: RequestStatus,
        reason: String,
    },

    /// The requested request was not found.
    #[error("VC_ERR_501: Request not found: {0}")]
    RequestNotFound(RequestId),

    // =================================================================
    // Receiver / Escrow Errors (6xx)
    // =================================================================
    /// A receiver already exists for this (account, batch, asset).
    #[error("VC_ERR_600: Receiver already exists for batch {0}")]
    ReceiverExists(BatchId),

    /// The requested receiver was not found.
    #[error("VC_ERR_601: Receiver not found for batch {0}")]
    ReceiverNotFound(BatchId),

    /// A release would exceed the receiver's remaining funds.
    #[error("VC_ERR_602: Insufficient receiver funds: need {needed}, remaining {remaining}")]
    InsufficientReceiverFunds { needed: Decimal, remaining: Decimal },

    // =================================================================
    // Invariant Errors (7xx)
    // =================================================================
    /// The 1:1 backing invariant no longer holds — critical safety alert.
    #[error("VC_ERR_700: Backing invariant violation: {reason}")]
    BackingViolation { reason: String },

    /// Burning more claim supply than is outstanding.
    #[error("VC_ERR_701: Claim supply underflow for asset {asset}: burn {burn} > outstanding {outstanding}")]
    SupplyUnderflow {
        asset: String,
        burn: Decimal,
        outstanding: Decimal,
    },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// The account is not registered.
    #[error("VC_ERR_900: Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Configuration error (out-of-range cooldown, bad tolerance, etc.).
    #[error("VC_ERR_901: Configuration error: {0}")]
    Configuration(String),

    /// Unrecoverable internal error.
    #[error("VC_ERR_902: Internal error: {0}")]
    Internal(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, VaultclearError>;
