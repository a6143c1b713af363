//! Custody adapter seam.
//!
//! The adapter is an external collaborator: it reports real total assets
//! for an (account, asset) pair and is told the new baseline after each
//! settlement. The core never moves real assets itself.

use std::collections::HashMap;

use rust_decimal::Decimal;
use vaultclear_types::{AccountId, Asset};

/// Reporting interface to whatever custodies or deploys real assets.
pub trait CustodyAdapter {
    /// The real total assets currently attributed to (account, asset).
    fn total_assets(&self, account: AccountId, asset: &str) -> Decimal;

    /// Record the post-settlement baseline for (account, asset).
    fn set_reported_total(&mut self, account: AccountId, asset: &str, total: Decimal);
}

/// In-memory custody adapter for tests and single-process deployments.
///
/// External reporting is simulated with [`RecordedCustody::report`];
/// the engine writes baselines back through `set_reported_total`.
pub struct RecordedCustody {
    totals: HashMap<(AccountId, Asset), Decimal>,
}

impl RecordedCustody {
    #[must_use]
    pub fn new() -> Self {
        Self {
            totals: HashMap::new(),
        }
    }

    /// Simulate an external report of real assets held for (account, asset).
    pub fn report(&mut self, account: AccountId, asset: &str, total: Decimal) {
        self.totals.insert((account, asset.to_string()), total);
    }
}

impl Default for RecordedCustody {
    fn default() -> Self {
        Self::new()
    }
}

impl CustodyAdapter for RecordedCustody {
    fn total_assets(&self, account: AccountId, asset: &str) -> Decimal {
        self.totals
            .get(&(account, asset.to_string()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn set_reported_total(&mut self, account: AccountId, asset: &str, total: Decimal) {
        self.totals.insert((account, asset.to_string()), total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreported_total_is_zero() {
        let custody = RecordedCustody::new();
        assert_eq!(
            custody.total_assets(AccountId::new(), "USDC"),
            Decimal::ZERO
        );
    }

    #[test]
    fn report_then_read() {
        let mut custody = RecordedCustody::new();
        let account = AccountId::new();
        custody.report(account, "USDC", Decimal::new(1500, 0));
        assert_eq!(
            custody.total_assets(account, "USDC"),
            Decimal::new(1500, 0)
        );
    }

    #[test]
    fn baseline_overwrites_report() {
        let mut custody = RecordedCustody::new();
        let account = AccountId::new();
        custody.report(account, "USDC", Decimal::new(1500, 0));
        custody.set_reported_total(account, "USDC", Decimal::new(1600, 0));
        assert_eq!(
            custody.total_assets(account, "USDC"),
            Decimal::new(1600, 0)
        );
    }
}
