//! Batch lifecycle types for the VaultClear settlement model.
//!
//! Each batch moves through three non-reversible states:
//! **ACTIVE → CLOSED → SETTLED**
//!
//! During ACTIVE, deposit and withdrawal-request intents are recorded
//! against the batch. CLOSED rejects further recording and makes the batch
//! eligible for a settlement proposal. SETTLED is terminal: the pending
//! balances have been committed and dependent requests become fulfillable.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, Asset, BatchId};

/// The three non-reversible states of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchStatus {
    /// Accepting new deposit / withdrawal-request intents.
    Active,
    /// No longer accepting intents; eligible for a settlement proposal.
    Closed,
    /// Settlement executed; pending balances committed. Terminal.
    Settled,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Settled => write!(f, "SETTLED"),
        }
    }
}

/// A settlement batch scoped to one `(account, asset)` pair.
///
/// At most one ACTIVE batch exists per `(account, asset)` at a time; once
/// SETTLED, the batch is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// Opaque identifier, time-ordered by creation.
    pub id: BatchId,
    /// The account this batch belongs to.
    pub account: AccountId,
    /// The asset this batch is scoped to.
    pub asset: Asset,
    /// Current lifecycle state.
    pub status: BatchStatus,
    /// When the batch was created.
    pub created_at: DateTime<Utc>,
    /// When the batch was closed, if it has been.
    pub closed_at: Option<DateTime<Utc>>,
    /// When the batch was settled, if it has been.
    pub settled_at: Option<DateTime<Utc>>,
    /// Exchange price recorded at settlement execution. Prices stake and
    /// unstake fulfillment for requests bound to this batch.
    pub settled_price: Option<Decimal>,
}

impl Batch {
    /// Create a fresh ACTIVE batch.
    #[must_use]
    pub fn open(account: AccountId, asset: impl Into<Asset>, now: DateTime<Utc>) -> Self {
        Self {
            id: BatchId::new(),
            account,
            asset: asset.into(),
            status: BatchStatus::Active,
            created_at: now,
            closed_at: None,
            settled_at: None,
            settled_price: None,
        }
    }

    /// Whether intents may still be recorded against this batch.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == BatchStatus::Active
    }

    /// Whether this batch has reached its terminal state.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.status == BatchStatus::Settled
    }
}
