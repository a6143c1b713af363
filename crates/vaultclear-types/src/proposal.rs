//! Settlement proposal types for the two-phase timelocked protocol.
//!
//! A proposal fixes the settlement arithmetic at propose time:
//! `netted = deposited - requested`, `adjusted_total = reported - netted`,
//! `yield = adjusted_total - last_settled_total`. Execution after the
//! cooldown commits these stored values; a guardian may cancel before the
//! cooldown elapses.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, Asset, BatchBalance, BatchId, ProposalId};

/// Lifecycle of a settlement proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Awaiting cooldown expiry; cancellable by the guardian.
    Pending,
    /// Committed: settled balance updated, batch marked SETTLED. Terminal.
    Executed,
    /// Cancelled by the guardian before execution. Terminal; the
    /// `(account, batch)` slot is free for a fresh proposal.
    Cancelled,
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Executed => write!(f, "EXECUTED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A proposed reconciliation of one batch against an externally reported
/// real total-assets figure.
///
/// All derived figures are fixed at propose time; `execute` commits them
/// verbatim after re-validating that the batch's pending balances have not
/// moved since the snapshot was taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementProposal {
    /// Unique proposal identifier.
    pub id: ProposalId,
    /// The account being settled.
    pub account: AccountId,
    /// The asset being settled.
    pub asset: Asset,
    /// The CLOSED batch this proposal reconciles.
    pub batch: BatchId,
    /// Real total assets reported by the custody adapter at propose time.
    pub reported_total: Decimal,
    /// The account's settled balance at propose time. Execution re-checks
    /// the live balance against this snapshot.
    pub last_total: Decimal,
    /// Net flow of the batch: `deposited - requested` (signed).
    pub netted: Decimal,
    /// Residual change not explained by recorded flow (signed); the
    /// attribution formula depends on the account's role.
    pub yield_delta: Decimal,
    /// Whether `yield_delta >= 0`.
    pub is_profit: bool,
    /// `reported_total - netted`: the reported total with this batch's net
    /// flow stripped out, which isolates yield against the prior baseline.
    pub adjusted_total: Decimal,
    /// Snapshot of the batch's pending balances at propose time. Execution
    /// re-checks the live balances against this snapshot.
    pub snapshot: BatchBalance,
    /// When the proposal was created.
    pub proposed_at: DateTime<Utc>,
    /// Earliest instant at which `execute` may commit.
    pub execute_after: DateTime<Utc>,
    /// Current lifecycle state.
    pub status: ProposalStatus,
}

impl SettlementProposal {
    /// Whether this proposal is still awaiting execution or cancellation.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == ProposalStatus::Pending
    }

    /// Whether the cooldown has elapsed at `now`. The boundary instant
    /// itself is executable.
    #[must_use]
    pub fn cooldown_elapsed(&self, now: DateTime<Utc>) -> bool {
        now >= self.execute_after
    }
}
