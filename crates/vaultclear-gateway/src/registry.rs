//! Request registry.
//!
//! Owns every redemption/stake/unstake request, pending and terminal.
//! Requests are indexed by batch so fulfillment and operator tooling can
//! enumerate what a settlement unlocks. Terminal requests stay queryable.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;
use vaultclear_types::{
    AccountId, BatchId, Request, RequestId, RequestKind, RequestStatus, Result, VaultclearError,
};

/// All requests, keyed by deterministic id.
pub struct RequestRegistry {
    requests: HashMap<RequestId, Request>,
    by_batch: HashMap<BatchId, Vec<RequestId>>,
    /// Monotonic disambiguator for id derivation.
    counter: u64,
}

impl RequestRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            requests: HashMap::new(),
            by_batch: HashMap::new(),
            counter: 0,
        }
    }

    /// Record a new PENDING request bound to the given batch.
    #[allow(clippy::too_many_arguments)]
    pub fn submit(
        &mut self,
        kind: RequestKind,
        owner: AccountId,
        asset: &str,
        amount: Decimal,
        batch: BatchId,
        recipient: AccountId,
        now: DateTime<Utc>,
    ) -> RequestId {
        let timestamp_ms = u64::try_from(now.timestamp_millis()).unwrap_or_default();
        let id = RequestId::derive(owner, amount, timestamp_ms, self.counter);
        self.counter += 1;
        let request = Request {
            id,
            kind,
            owner,
            asset: asset.to_string(),
            amount,
            batch,
            recipient,
            status: RequestStatus::Pending,
            submitted_at: now,
        };
        info!(request = %id, %kind, %owner, asset, %amount, %batch, "submitted request");
        self.requests.insert(id, request);
        self.by_batch.entry(batch).or_default().push(id);
        id
    }

    /// Look up a request (pending or terminal).
    #[must_use]
    pub fn get(&self, id: RequestId) -> Option<&Request> {
        self.requests.get(&id)
    }

    /// Transition a PENDING request to FULFILLED.
    ///
    /// # Errors
    /// `RequestNotFound` or `RequestStateError` if not PENDING.
    pub fn mark_fulfilled(&mut self, id: RequestId) -> Result<()> {
        self.transition(id, RequestStatus::Fulfilled, "fulfilled")
    }

    /// Transition a PENDING request to CANCELLED.
    ///
    /// # Errors
    /// `RequestNotFound` or `RequestStateError` if not PENDING.
    pub fn mark_cancelled(&mut self, id: RequestId) -> Result<()> {
        self.transition(id, RequestStatus::Cancelled, "cancelled")
    }

    fn transition(&mut self, id: RequestId, to: RequestStatus, verb: &str) -> Result<()> {
        let request = self
            .requests
            .get_mut(&id)
            .ok_or(VaultclearError::RequestNotFound(id))?;
        if request.status != RequestStatus::Pending {
            return Err(VaultclearError::RequestStateError {
                request: id,
                actual: request.status,
                reason: format!("only PENDING requests can be {verb}"),
            });
        }
        request.status = to;
        info!(request = %id, status = %to, "request transition");
        Ok(())
    }

    /// All request ids recorded under a batch, in submission order.
    #[must_use]
    pub fn for_batch(&self, batch: BatchId) -> &[RequestId] {
        self.by_batch.get(&batch).map_or(&[], Vec::as_slice)
    }

    /// The still-PENDING requests recorded under a batch.
    #[must_use]
    pub fn pending_for_batch(&self, batch: BatchId) -> Vec<&Request> {
        self.for_batch(batch)
            .iter()
            .filter_map(|id| self.requests.get(id))
            .filter(|r| r.is_pending())
            .collect()
    }

    /// Number of requests tracked (all states).
    #[must_use]
    pub fn count(&self) -> usize {
        self.requests.len()
    }
}

impl Default for RequestRegistry {
    fn default() -> Self {
        Self::new()
    }
}
