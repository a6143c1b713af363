//! Batch receiver arena — per-batch escrow records.
//!
//! Each settled gateway batch with outstanding redemptions gets exactly one
//! receiver per asset, created and funded by the settlement engine.
//! Receivers are indexed by their `(account, batch, asset)` key; identity
//! fields never change after creation, and funds only leave through
//! `release`, called by the gateway's fulfillment flow.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;
use vaultclear_types::{
    AccountId, BatchId, BatchReceiver, ReceiverId, Result, VaultclearError,
};

/// Arena of all batch receivers, indexed by derived id.
pub struct ReceiverArena {
    receivers: HashMap<ReceiverId, BatchReceiver>,
}

impl ReceiverArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            receivers: HashMap::new(),
        }
    }

    /// Create a receiver for `(account, batch, asset)`. One per key.
    ///
    /// # Errors
    /// Returns `ReceiverExists` if the key already has a receiver.
    pub fn create(
        &mut self,
        account: AccountId,
        batch: BatchId,
        asset: &str,
        now: DateTime<Utc>,
    ) -> Result<ReceiverId> {
        let id = ReceiverId::derive(account, batch, asset);
        if self.receivers.contains_key(&id) {
            return Err(VaultclearError::ReceiverExists(batch));
        }
        self.receivers
            .insert(id, BatchReceiver::new(account, batch, asset, now));
        info!(%account, %batch, asset, receiver = %id, "created batch receiver");
        Ok(id)
    }

    /// Fund a receiver with settlement proceeds.
    ///
    /// # Errors
    /// Returns `ReceiverNotFound` if no receiver exists for the key.
    pub fn fund(
        &mut self,
        account: AccountId,
        batch: BatchId,
        asset: &str,
        amount: Decimal,
    ) -> Result<()> {
        let id = ReceiverId::derive(account, batch, asset);
        let recv = self
            .receivers
            .get_mut(&id)
            .ok_or(VaultclearError::ReceiverNotFound(batch))?;
        recv.funded += amount;
        Ok(())
    }

    /// Release funds to a redeemer. Bounded by the remaining balance.
    ///
    /// # Errors
    /// - `ReceiverNotFound` if no receiver exists for the key
    /// - `InsufficientReceiverFunds` if `amount` exceeds the remainder
    pub fn release(
        &mut self,
        account: AccountId,
        batch: BatchId,
        asset: &str,
        amount: Decimal,
    ) -> Result<()> {
        let id = ReceiverId::derive(account, batch, asset);
        let recv = self
            .receivers
            .get_mut(&id)
            .ok_or(VaultclearError::ReceiverNotFound(batch))?;
        let remaining = recv.remaining();
        if amount > remaining {
            return Err(VaultclearError::InsufficientReceiverFunds {
                needed: amount,
                remaining,
            });
        }
        recv.released += amount;
        info!(%batch, asset, %amount, "released from batch receiver");
        Ok(())
    }

    /// Look up a receiver by id.
    #[must_use]
    pub fn get(&self, id: ReceiverId) -> Option<&BatchReceiver> {
        self.receivers.get(&id)
    }

    /// Look up a receiver by its key.
    #[must_use]
    pub fn get_by_key(
        &self,
        account: AccountId,
        batch: BatchId,
        asset: &str,
    ) -> Option<&BatchReceiver> {
        self.receivers
            .get(&ReceiverId::derive(account, batch, asset))
    }

    /// Number of receivers tracked.
    #[must_use]
    pub fn count(&self) -> usize {
        self.receivers.len()
    }
}

impl Default for ReceiverArena {
    fn default() -> Self {
        Self::new()
    }
}
