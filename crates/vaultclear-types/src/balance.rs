//! Balance types for the VaultClear virtual-ledger model.
//!
//! Every `(account, batch)` pair accumulates a pending `BatchBalance`
//! (deposits in, withdrawal requests out) until settlement clears it into
//! the account's settled virtual balance.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pending deposited/requested amounts for one `(account, batch)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchBalance {
    /// Assets recorded as deposited into this batch.
    pub deposited: Decimal,
    /// Assets requested for withdrawal against this batch.
    pub requested: Decimal,
}

impl BatchBalance {
    /// Create a zero balance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            deposited: Decimal::ZERO,
            requested: Decimal::ZERO,
        }
    }

    /// Net flow for the batch: `deposited - requested` (signed).
    #[must_use]
    pub fn netted(&self) -> Decimal {
        self.deposited - self.requested
    }

    /// Whether this entry has no pending activity at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.deposited.is_zero() && self.requested.is_zero()
    }
}

impl Default for BatchBalance {
    fn default() -> Self {
        Self::new()
    }
}

/// Type alias for asset identifiers (e.g., "USDC", "WBTC").
pub type Asset = String;
