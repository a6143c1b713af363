//! Per-batch escrow receivers.
//!
//! When a gateway batch settles with outstanding redemption requests, the
//! settlement engine creates one receiver for the batch and funds it with
//! the requested amount. Redeemers draw from the receiver at fulfillment.
//! Identity fields are fixed at creation; only the funding level moves.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, Asset, BatchId, ReceiverId};

/// An escrow record scoped to a single `(account, batch, asset)` triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReceiver {
    /// Identifier derived from the `(account, batch, asset)` key.
    pub id: ReceiverId,
    /// The account whose batch this receiver serves.
    pub account: AccountId,
    /// The settled batch this receiver escrows for.
    pub batch: BatchId,
    /// The escrowed asset.
    pub asset: Asset,
    /// Total amount funded into the receiver at settlement.
    pub funded: Decimal,
    /// Amount released to redeemers so far. Never exceeds `funded`.
    pub released: Decimal,
    /// When the receiver was created.
    pub created_at: DateTime<Utc>,
}

impl BatchReceiver {
    /// Create an unfunded receiver for the given key.
    #[must_use]
    pub fn new(
        account: AccountId,
        batch: BatchId,
        asset: impl Into<Asset>,
        now: DateTime<Utc>,
    ) -> Self {
        let asset = asset.into();
        Self {
            id: ReceiverId::derive(account, batch, &asset),
            account,
            batch,
            asset,
            funded: Decimal::ZERO,
            released: Decimal::ZERO,
            created_at: now,
        }
    }

    /// Funds still available for release.
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        self.funded - self.released
    }
}
