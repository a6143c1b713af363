//! Batch lifecycle manager.
//!
//! Governs the ACTIVE → CLOSED → SETTLED state machine per batch and
//! enforces the single-ACTIVE-batch rule per (account, asset). Batches for
//! different accounts are fully independent, so settlements can proceed in
//! parallel across accounts.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;
use vaultclear_types::{
    AccountId, Asset, Batch, BatchId, BatchStatus, Result, VaultclearError,
};

/// Owns every batch and its lifecycle transitions.
pub struct BatchManager {
    /// All batches, active and historical.
    batches: HashMap<BatchId, Batch>,
    /// The single ACTIVE batch per (account, asset), if any.
    active: HashMap<(AccountId, Asset), BatchId>,
}

impl BatchManager {
    /// Create an empty batch manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            batches: HashMap::new(),
            active: HashMap::new(),
        }
    }

    /// Open a fresh ACTIVE batch for (account, asset).
    ///
    /// # Errors
    /// Returns `BatchAlreadyActive` if an ACTIVE batch already exists for
    /// this (account, asset).
    pub fn create_batch(
        &mut self,
        account: AccountId,
        asset: &str,
        now: DateTime<Utc>,
    ) -> Result<BatchId> {
        let key = (account, asset.to_string());
        if self.active.contains_key(&key) {
            return Err(VaultclearError::BatchAlreadyActive {
                account,
                asset: asset.to_string(),
            });
        }
        let batch = Batch::open(account, asset, now);
        let id = batch.id;
        self.batches.insert(id, batch);
        self.active.insert(key, id);
        info!(%account, asset, batch = %id, "created batch");
        Ok(id)
    }

    /// Close an ACTIVE batch, optionally opening its successor atomically.
    ///
    /// Returns the successor's id when `create_next` is set.
    ///
    /// # Errors
    /// - `BatchNotFound` if the batch does not exist
    /// - `BatchStateError` if the batch is not ACTIVE
    pub fn close_batch(
        &mut self,
        batch: BatchId,
        create_next: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<BatchId>> {
        let entry = self
            .batches
            .get_mut(&batch)
            .ok_or(VaultclearError::BatchNotFound(batch))?;
        if entry.status != BatchStatus::Active {
            return Err(VaultclearError::BatchStateError {
                batch,
                expected: BatchStatus::Active,
                actual: entry.status,
            });
        }
        entry.status = BatchStatus::Closed;
        entry.closed_at = Some(now);
        let account = entry.account;
        let asset = entry.asset.clone();
        self.active.remove(&(account, asset.clone()));
        info!(%account, asset, %batch, "closed batch");

        if create_next {
            let next = self.create_batch(account, &asset, now)?;
            Ok(Some(next))
        } else {
            Ok(None)
        }
    }

    /// Transition a CLOSED batch to SETTLED, recording the settlement-time
    /// exchange price. Called only by the settlement engine on successful
    /// execution; this is what unlocks request fulfillment.
    ///
    /// # Errors
    /// - `BatchNotFound` if the batch does not exist
    /// - `BatchStateError` if the batch is not CLOSED
    pub fn mark_settled(
        &mut self,
        batch: BatchId,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let entry = self
            .batches
            .get_mut(&batch)
            .ok_or(VaultclearError::BatchNotFound(batch))?;
        if entry.status != BatchStatus::Closed {
            return Err(VaultclearError::BatchStateError {
                batch,
                expected: BatchStatus::Closed,
                actual: entry.status,
            });
        }
        entry.status = BatchStatus::Settled;
        entry.settled_at = Some(now);
        entry.settled_price = Some(price);
        info!(%batch, %price, "batch settled");
        Ok(())
    }

    /// Look up a batch by id.
    #[must_use]
    pub fn get(&self, batch: BatchId) -> Option<&Batch> {
        self.batches.get(&batch)
    }

    /// The lifecycle state of a batch.
    ///
    /// # Errors
    /// Returns `BatchNotFound` if the batch does not exist.
    pub fn status(&self, batch: BatchId) -> Result<BatchStatus> {
        self.batches
            .get(&batch)
            .map(|b| b.status)
            .ok_or(VaultclearError::BatchNotFound(batch))
    }

    /// Require a batch to be in a specific state.
    ///
    /// # Errors
    /// `BatchNotFound` or `BatchStateError`.
    pub fn ensure_status(&self, batch: BatchId, expected: BatchStatus) -> Result<()> {
        let actual = self.status(batch)?;
        if actual == expected {
            Ok(())
        } else {
            Err(VaultclearError::BatchStateError {
                batch,
                expected,
                actual,
            })
        }
    }

    /// The currently ACTIVE batch for (account, asset), if any.
    #[must_use]
    pub fn active_batch(&self, account: AccountId, asset: &str) -> Option<BatchId> {
        self.active.get(&(account, asset.to_string())).copied()
    }

    /// Number of batches tracked (all states).
    #[must_use]
    pub fn count(&self) -> usize {
        self.batches.len()
    }
}

impl Default for BatchManager {
    fn default() -> Self {
        Self::new()
    }
}
