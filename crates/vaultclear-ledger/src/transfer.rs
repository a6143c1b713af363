//! Transfer coordinator — virtual reallocation between accounts.
//!
//! A thin facade over [`Ledger::transfer`], used for planned capital
//! allocation (institutional pool → yield vault) and for peg protection
//! (pulling virtual balance back to the redemption-serving account when
//! outstanding requests exceed its settled balance). No real assets move
//! here; real movement is reconciled at the next settlement of both
//! affected accounts.

use rust_decimal::Decimal;
use tracing::info;
use vaultclear_types::{AccountId, BatchId, Result};

use crate::ledger::Ledger;

/// Coordinates inter-account virtual transfers.
pub struct TransferCoordinator;

impl TransferCoordinator {
    /// Allocate `amount` of virtual balance from `source` to `target`
    /// under the given batch.
    ///
    /// # Errors
    /// Propagates `AssetNotSupported` / `InsufficientVirtualBalance` from
    /// the ledger; on error neither side is mutated.
    pub fn allocate(
        ledger: &mut Ledger,
        source: AccountId,
        target: AccountId,
        asset: &str,
        amount: Decimal,
        batch: BatchId,
    ) -> Result<()> {
        ledger.transfer(source, target, asset, amount, batch)?;
        info!(%source, %target, asset, %amount, %batch, "allocated capital");
        Ok(())
    }

    /// Pull back exactly the redemption account's shortfall from the yield
    /// account: `max(0, requested - settled)` for the given batch.
    ///
    /// Returns the amount pulled (zero when the account is fully covered).
    ///
    /// # Errors
    /// Propagates ledger errors from the underlying transfer.
    pub fn peg_protect(
        ledger: &mut Ledger,
        redemption_account: AccountId,
        yield_account: AccountId,
        asset: &str,
        batch: BatchId,
    ) -> Result<Decimal> {
        let pending = ledger.batch_balances(redemption_account, batch);
        let settled = ledger.settled(redemption_account, asset);
        let shortfall = pending.requested - settled;
        if shortfall <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        ledger.transfer(yield_account, redemption_account, asset, shortfall, batch)?;
        info!(
            %redemption_account, %yield_account, asset, %shortfall, %batch,
            "peg protection transfer"
        );
        Ok(shortfall)
    }
}
