//! Request types for redemption, stake, and unstake intents.
//!
//! A request binds an intent to the batch that was ACTIVE at submission.
//! It stays PENDING until that batch settles (then it may be fulfilled) or
//! until cancelled while the batch is still ACTIVE.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, Asset, BatchId, RequestId};

/// The kind of asynchronous intent a request represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// Gateway-facing: redeem claims for custodied assets.
    Redeem,
    /// Vault-facing: convert assets to vault shares at settlement price.
    Stake,
    /// Vault-facing: convert vault shares back to assets at settlement price.
    Unstake,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redeem => write!(f, "REDEEM"),
            Self::Stake => write!(f, "STAKE"),
            Self::Unstake => write!(f, "UNSTAKE"),
        }
    }
}

/// Lifecycle of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Awaiting batch settlement.
    Pending,
    /// Terminal: fulfilled after the batch settled.
    Fulfilled,
    /// Terminal: cancelled while the batch was still ACTIVE.
    Cancelled,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Fulfilled => write!(f, "FULFILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A single deposit/redeem/stake/unstake intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Deterministic unique identifier.
    pub id: RequestId,
    /// What this request does at fulfillment.
    pub kind: RequestKind,
    /// The account that submitted the request.
    pub owner: AccountId,
    /// The asset the amount is denominated in.
    pub asset: Asset,
    /// The requested amount (assets for Redeem/Stake, shares for Unstake).
    pub amount: Decimal,
    /// The batch that was ACTIVE when the request was recorded.
    pub batch: BatchId,
    /// Where fulfilled proceeds are delivered.
    pub recipient: AccountId,
    /// Current lifecycle state.
    pub status: RequestStatus,
    /// When the request was submitted.
    pub submitted_at: DateTime<Utc>,
}

impl Request {
    /// Whether this request is still awaiting its terminal operation.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}
