//! Claim and share supply tracking, plus the backing invariant.
//!
//! Invariant checked after settlements:
//! ```text
//! ∀ asset: Σ(settled virtual balances) + custody reported totals ≥ outstanding claims
//! ```
//!
//! If this ever breaks, issued claims are no longer fully backed and the
//! system must halt with a critical alert.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{info, warn};
use vaultclear_types::{AccountId, Asset, Result, VaultclearError};

/// Tracks outstanding claim supply per asset and share supply per vault.
pub struct ClaimSupply {
    /// Outstanding claims per asset (minted 1:1 on deposit, adjusted by
    /// vault yield, burned on redemption).
    outstanding: HashMap<Asset, Decimal>,
    /// Outstanding vault shares per vault account.
    shares: HashMap<AccountId, Decimal>,
}

impl ClaimSupply {
    /// Create an empty supply tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            outstanding: HashMap::new(),
            shares: HashMap::new(),
        }
    }

    /// Mint claims (deposit issuance or vault profit).
    pub fn mint(&mut self, asset: &str, amount: Decimal) {
        *self
            .outstanding
            .entry(asset.to_string())
            .or_insert(Decimal::ZERO) += amount;
    }

    /// Burn claims (redemption or vault loss).
    ///
    /// # Errors
    /// Returns `SupplyUnderflow` if `amount` exceeds outstanding supply.
    pub fn burn(&mut self, asset: &str, amount: Decimal) -> Result<()> {
        let outstanding = self.outstanding(asset);
        if amount > outstanding {
            return Err(VaultclearError::SupplyUnderflow {
                asset: asset.to_string(),
                burn: amount,
                outstanding,
            });
        }
        *self
            .outstanding
            .entry(asset.to_string())
            .or_insert(Decimal::ZERO) -= amount;
        Ok(())
    }

    /// Outstanding claim supply for an asset.
    #[must_use]
    pub fn outstanding(&self, asset: &str) -> Decimal {
        self.outstanding
            .get(asset)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Mint vault shares to a staker's vault.
    pub fn mint_shares(&mut self, vault: AccountId, amount: Decimal) {
        *self.shares.entry(vault).or_insert(Decimal::ZERO) += amount;
    }

    /// Burn vault shares.
    ///
    /// # Errors
    /// Returns `BalanceUnderflow` if `amount` exceeds the vault's share supply.
    pub fn burn_shares(&mut self, vault: AccountId, amount: Decimal) -> Result<()> {
        let supply = self.share_supply(vault);
        if amount > supply {
            return Err(VaultclearError::BalanceUnderflow);
        }
        *self.shares.entry(vault).or_insert(Decimal::ZERO) -= amount;
        Ok(())
    }

    /// Outstanding share supply for a vault.
    #[must_use]
    pub fn share_supply(&self, vault: AccountId) -> Decimal {
        self.shares.get(&vault).copied().unwrap_or(Decimal::ZERO)
    }

    /// Verify the 1:1 (or better) backing guarantee for an asset.
    ///
    /// # Errors
    /// Returns [`VaultclearError::BackingViolation`] if
    /// `virtual_total + custody_total < outstanding`.
    pub fn verify_backing(
        &self,
        asset: &str,
        virtual_total: Decimal,
        custody_total: Decimal,
    ) -> Result<()> {
        let outstanding = self.outstanding(asset);
        let backing = virtual_total + custody_total;
        if backing < outstanding {
            warn!(asset, %backing, %outstanding, "backing invariant violated");
            return Err(VaultclearError::BackingViolation {
                reason: format!(
                    "Asset {asset}: backing {backing} < outstanding claims {outstanding} \
                     (virtual={virtual_total}, custody={custody_total})"
                ),
            });
        }
        info!(asset, %backing, %outstanding, "backing verified");
        Ok(())
    }
}

impl Default for ClaimSupply {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_supply_is_zero() {
        let supply = ClaimSupply::new();
        assert_eq!(supply.outstanding("USDC"), Decimal::ZERO);
        assert_eq!(supply.share_supply(AccountId::new()), Decimal::ZERO);
    }

    #[test]
    fn mint_and_burn() {
        let mut supply = ClaimSupply::new();
        supply.mint("USDC", Decimal::new(1000, 0));
        supply.mint("USDC", Decimal::new(500, 0));
        assert_eq!(supply.outstanding("USDC"), Decimal::new(1500, 0));

        supply.burn("USDC", Decimal::new(400, 0)).unwrap();
        assert_eq!(supply.outstanding("USDC"), Decimal::new(1100, 0));
    }

    #[test]
    fn burn_beyond_outstanding_rejected() {
        let mut supply = ClaimSupply::new();
        supply.mint("USDC", Decimal::new(100, 0));
        let err = supply.burn("USDC", Decimal::new(101, 0)).unwrap_err();
        assert!(matches!(err, VaultclearError::SupplyUnderflow { .. }));
        assert_eq!(supply.outstanding("USDC"), Decimal::new(100, 0));
    }

    #[test]
    fn shares_per_vault_independent() {
        let mut supply = ClaimSupply::new();
        let a = AccountId::new();
        let b = AccountId::new();
        supply.mint_shares(a, Decimal::new(10, 0));
        supply.mint_shares(b, Decimal::new(5, 0));
        supply.burn_shares(a, Decimal::new(4, 0)).unwrap();
        assert_eq!(supply.share_supply(a), Decimal::new(6, 0));
        assert_eq!(supply.share_supply(b), Decimal::new(5, 0));
    }

    #[test]
    fn burn_shares_underflow_rejected() {
        let mut supply = ClaimSupply::new();
        let vault = AccountId::new();
        let err = supply.burn_shares(vault, Decimal::ONE).unwrap_err();
        assert!(matches!(err, VaultclearError::BalanceUnderflow));
    }

    #[test]
    fn backing_holds_when_covered() {
        let mut supply = ClaimSupply::new();
        supply.mint("USDC", Decimal::new(1000, 0));
        // Exactly 1:1 backing.
        supply
            .verify_backing("USDC", Decimal::new(1000, 0), Decimal::ZERO)
            .unwrap();
        // Better than 1:1.
        supply
            .verify_backing("USDC", Decimal::new(600, 0), Decimal::new(500, 0))
            .unwrap();
    }

    #[test]
    fn backing_violation_detected() {
        let mut supply = ClaimSupply::new();
        supply.mint("USDC", Decimal::new(1000, 0));
        let err = supply
            .verify_backing("USDC", Decimal::new(400, 0), Decimal::new(500, 0))
            .unwrap_err();
        assert!(matches!(err, VaultclearError::BackingViolation { .. }));
    }
}
