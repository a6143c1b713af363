//! The virtual-balance ledger.
//!
//! Tracks per-(account, asset) settled balances and per-(account, batch)
//! pending balances. All mutations are atomic: either the full operation
//! succeeds or the ledger is unchanged. Settled balances are written only
//! by settlement execution (`commit_settled` / `credit_settled`) and by
//! explicit transfers.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use tracing::debug;
use vaultclear_types::{AccountId, Asset, BatchBalance, BatchId, Result, VaultclearError};

/// The virtual-balance store — the source of truth for all accounting state.
pub struct Ledger {
    /// Assets registered for recording. Anything else is rejected.
    assets: HashSet<Asset>,
    /// Settled balance per (account, asset).
    settled: HashMap<(AccountId, Asset), Decimal>,
    /// Pending deposited/requested per (account, batch).
    pending: HashMap<(AccountId, BatchId), BatchBalance>,
}

impl Ledger {
    /// Create an empty ledger with no registered assets.
    #[must_use]
    pub fn new() -> Self {
        Self {
            assets: HashSet::new(),
            settled: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    /// Register an asset for recording.
    pub fn register_asset(&mut self, asset: impl Into<Asset>) {
        self.assets.insert(asset.into());
    }

    /// Whether an asset has been registered.
    #[must_use]
    pub fn is_supported(&self, asset: &str) -> bool {
        self.assets.contains(asset)
    }

    fn ensure_supported(&self, asset: &str) -> Result<()> {
        if self.is_supported(asset) {
            Ok(())
        } else {
            Err(VaultclearError::AssetNotSupported(asset.to_string()))
        }
    }

    /// Record a deposit intent into the given batch.
    ///
    /// # Errors
    /// Returns `AssetNotSupported` if the asset is unregistered.
    pub fn record_deposit(
        &mut self,
        account: AccountId,
        asset: &str,
        amount: Decimal,
        batch: BatchId,
    ) -> Result<()> {
        self.ensure_supported(asset)?;
        let entry = self.pending.entry((account, batch)).or_default();
        entry.deposited += amount;
        debug!(%account, %batch, %amount, "recorded deposit");
        Ok(())
    }

    /// Record a withdrawal-request intent into the given batch.
    ///
    /// The request is only accepted if total `requested` stays within the
    /// account's settled balance plus this batch's deposits.
    ///
    /// # Errors
    /// - `AssetNotSupported` if the asset is unregistered
    /// - `InsufficientVirtualBalance` if the request would exceed
    ///   `settled + deposited` for this batch
    pub fn record_withdrawal_request(
        &mut self,
        account: AccountId,
        asset: &str,
        amount: Decimal,
        batch: BatchId,
    ) -> Result<()> {
        self.ensure_supported(asset)?;
        let settled = self.settled(account, asset);
        let entry = self.pending.entry((account, batch)).or_default();
        let available = settled + entry.deposited - entry.requested;
        if amount > available {
            return Err(VaultclearError::InsufficientVirtualBalance {
                needed: amount,
                available,
            });
        }
        entry.requested += amount;
        debug!(%account, %batch, %amount, "recorded withdrawal request");
        Ok(())
    }

    /// Atomically move virtual balance between accounts under one batch id:
    /// a withdrawal-request against `source` and a deposit to `target`.
    ///
    /// Both sub-operations succeed or neither applies.
    ///
    /// # Errors
    /// - `AssetNotSupported` if the asset is unregistered
    /// - `InsufficientVirtualBalance` if the source side would exceed its
    ///   settled + deposited capacity
    pub fn transfer(
        &mut self,
        source: AccountId,
        target: AccountId,
        asset: &str,
        amount: Decimal,
        batch: BatchId,
    ) -> Result<()> {
        self.ensure_supported(asset)?;

        // Validate the source side before touching any state.
        let settled = self.settled(source, asset);
        let src = self.pending.get(&(source, batch)).cloned().unwrap_or_default();
        let available = settled + src.deposited - src.requested;
        if amount > available {
            return Err(VaultclearError::InsufficientVirtualBalance {
                needed: amount,
                available,
            });
        }

        self.pending.entry((source, batch)).or_default().requested += amount;
        self.pending.entry((target, batch)).or_default().deposited += amount;
        debug!(%source, %target, %batch, %amount, "transferred virtual balance");
        Ok(())
    }

    /// Reverse part of a previously recorded deposit (request cancellation
    /// while the batch is still ACTIVE).
    ///
    /// # Errors
    /// Returns `BalanceUnderflow` if `amount` exceeds the recorded deposits.
    pub fn reverse_deposit(
        &mut self,
        account: AccountId,
        amount: Decimal,
        batch: BatchId,
    ) -> Result<()> {
        let entry = self.pending.entry((account, batch)).or_default();
        if amount > entry.deposited {
            return Err(VaultclearError::BalanceUnderflow);
        }
        entry.deposited -= amount;
        Ok(())
    }

    /// Reverse part of a previously recorded withdrawal request.
    ///
    /// # Errors
    /// Returns `BalanceUnderflow` if `amount` exceeds the recorded requests.
    pub fn reverse_withdrawal_request(
        &mut self,
        account: AccountId,
        amount: Decimal,
        batch: BatchId,
    ) -> Result<()> {
        let entry = self.pending.entry((account, batch)).or_default();
        if amount > entry.requested {
            return Err(VaultclearError::BalanceUnderflow);
        }
        entry.requested -= amount;
        Ok(())
    }

    /// The settled virtual balance for a (account, asset) pair.
    #[must_use]
    pub fn settled(&self, account: AccountId, asset: &str) -> Decimal {
        self.settled
            .get(&(account, asset.to_string()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// The pending balances for a (account, batch) pair.
    #[must_use]
    pub fn batch_balances(&self, account: AccountId, batch: BatchId) -> BatchBalance {
        self.pending
            .get(&(account, batch))
            .cloned()
            .unwrap_or_default()
    }

    /// Overwrite the settled balance with a settlement result.
    ///
    /// Settlement-engine-only writer: this is the commit step of `execute`.
    ///
    /// # Errors
    /// Returns `BalanceUnderflow` if `total` is negative.
    pub fn commit_settled(&mut self, account: AccountId, asset: &str, total: Decimal) -> Result<()> {
        if total < Decimal::ZERO {
            return Err(VaultclearError::BalanceUnderflow);
        }
        self.settled.insert((account, asset.to_string()), total);
        Ok(())
    }

    /// Add to an account's settled balance (routing net inflow at settlement).
    pub fn credit_settled(&mut self, account: AccountId, asset: &str, amount: Decimal) {
        *self
            .settled
            .entry((account, asset.to_string()))
            .or_insert(Decimal::ZERO) += amount;
    }

    /// Remove and return the pending balances for a (account, batch) pair.
    /// Called by settlement execution when the batch's entries are cleared.
    pub fn take_pending(&mut self, account: AccountId, batch: BatchId) -> BatchBalance {
        self.pending.remove(&(account, batch)).unwrap_or_default()
    }

    /// Pending balances recorded under `batch` for accounts other than its
    /// owner. These entries exist only through transfers recorded under the
    /// owner's batch and settle when that batch settles.
    #[must_use]
    pub fn counterparty_pending(
        &self,
        batch: BatchId,
        owner: AccountId,
    ) -> Vec<(AccountId, BatchBalance)> {
        let mut entries: Vec<_> = self
            .pending
            .iter()
            .filter(|((account, b), _)| *b == batch && *account != owner)
            .map(|((account, _), bal)| (*account, bal.clone()))
            .collect();
        entries.sort_by_key(|(account, _)| *account);
        entries
    }

    /// Remove and return all counterparty pending entries under `batch`.
    pub fn take_counterparty_pending(
        &mut self,
        batch: BatchId,
        owner: AccountId,
    ) -> Vec<(AccountId, BatchBalance)> {
        let entries = self.counterparty_pending(batch, owner);
        for (account, _) in &entries {
            self.pending.remove(&(*account, batch));
        }
        entries
    }

    /// Sum of all accounts' settled balances for an asset.
    #[must_use]
    pub fn total_settled(&self, asset: &str) -> Decimal {
        self.settled
            .iter()
            .filter(|((_, a), _)| a == asset)
            .map(|(_, amount)| *amount)
            .sum()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
