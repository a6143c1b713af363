//! The Platform facade.
//!
//! Owns every plane and exposes the external operations. All mutating
//! operations take `&mut self`, which gives the single-writer, serialized
//! execution model: no operation observes another mid-mutation, and no
//! operation blocks — the settlement cooldown is evaluated lazily on each
//! execute attempt rather than by a timer.
//!
//! Capability checks happen here, once per operation, and nowhere deeper.
//! Settlement execution and request fulfillment are permissionless: both
//! only commit outcomes fixed and bounded by earlier privileged steps.
//!
//! ```text
//! deposit / request_* ──▶ Ledger + RequestRegistry   (ACTIVE batch)
//! close_batch         ──▶ BatchManager               (ACTIVE → CLOSED)
//! propose_settlement  ──▶ SettlementEngine           (arithmetic fixed)
//! execute_settlement  ──▶ Ledger + ClaimSupply + ReceiverArena (commit)
//! fulfill / claim_*   ──▶ ReceiverArena + ClaimSupply (SETTLED batch)
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;
use vaultclear_ledger::{BatchManager, Ledger, ReceiverArena, TransferCoordinator};
use vaultclear_settlement::{
    AccountDirectory, ClaimSupply, CustodyAdapter, RecordedCustody, SettlementEngine,
};
use vaultclear_types::{
    AccountId, AccountInfo, AccountRole, Batch, BatchBalance, BatchId, BatchReceiver, BatchStatus,
    ProposalId, Request, RequestId, RequestKind, Result, SettlementConfig, SettlementProposal,
    VaultclearError,
};

use crate::accounts::AccountRegistry;
use crate::auth::{Capability, CapabilitySet};
use crate::registry::RequestRegistry;

/// The top-level facade wiring the accounting, settlement, and boundary
/// planes together.
pub struct Platform<C: CustodyAdapter = RecordedCustody> {
    ledger: Ledger,
    batches: BatchManager,
    receivers: ReceiverArena,
    supply: ClaimSupply,
    engine: SettlementEngine,
    requests: RequestRegistry,
    accounts: AccountRegistry,
    custody: C,
}

impl Platform<RecordedCustody> {
    /// Create a platform with the in-memory custody adapter.
    #[must_use]
    pub fn new(config: SettlementConfig) -> Self {
        Self::with_custody(config, RecordedCustody::new())
    }
}

impl<C: CustodyAdapter> Platform<C> {
    /// Create a platform over a caller-provided custody adapter.
    #[must_use]
    pub fn with_custody(config: SettlementConfig, custody: C) -> Self {
        Self {
            ledger: Ledger::new(),
            batches: BatchManager::new(),
            receivers: ReceiverArena::new(),
            supply: ClaimSupply::new(),
            engine: SettlementEngine::new(config),
            requests: RequestRegistry::new(),
            accounts: AccountRegistry::new(),
            custody,
        }
    }

    // =====================================================================
    // Administration
    // =====================================================================

    /// Register an asset for recording.
    pub fn register_asset(&mut self, caller: &CapabilitySet, asset: &str) -> Result<()> {
        caller.require(Capability::Admin)?;
        self.ledger.register_asset(asset);
        Ok(())
    }

    /// Register an account.
    pub fn register_account(
        &mut self,
        caller: &CapabilitySet,
        role: AccountRole,
        name: impl Into<String>,
    ) -> Result<AccountId> {
        caller.require(Capability::Admin)?;
        Ok(self.accounts.register(role, name))
    }

    /// Pair a gateway's net inflow for an asset with a vault.
    pub fn pair_vault(
        &mut self,
        caller: &CapabilitySet,
        gateway: AccountId,
        asset: &str,
        vault: AccountId,
    ) -> Result<()> {
        caller.require(Capability::Admin)?;
        self.accounts.pair_vault(gateway, asset, vault)
    }

    /// Update the settlement cooldown.
    pub fn set_cooldown(
        &mut self,
        caller: &CapabilitySet,
        cooldown: std::time::Duration,
    ) -> Result<()> {
        caller.require(Capability::Admin)?;
        self.engine.config_mut().set_cooldown(cooldown)
    }

    /// Update the yield tolerance ceiling.
    pub fn set_yield_tolerance(
        &mut self,
        caller: &CapabilitySet,
        bps: Option<u32>,
    ) -> Result<()> {
        caller.require(Capability::Admin)?;
        self.engine.config_mut().set_yield_tolerance(bps)
    }

    // =====================================================================
    // Batch lifecycle
    // =====================================================================

    /// Open a fresh ACTIVE batch for (account, asset).
    pub fn open_batch(
        &mut self,
        caller: &CapabilitySet,
        account: AccountId,
        asset: &str,
    ) -> Result<BatchId> {
        caller.require(Capability::CloseBatch)?;
        self.accounts.role(account)?;
        self.batches.create_batch(account, asset, Utc::now())
    }

    /// Close an ACTIVE batch, optionally opening its successor atomically.
    pub fn close_batch(
        &mut self,
        caller: &CapabilitySet,
        batch: BatchId,
        create_next: bool,
    ) -> Result<Option<BatchId>> {
        caller.require(Capability::CloseBatch)?;
        self.batches.close_batch(batch, create_next, Utc::now())
    }

    // =====================================================================
    // Gateway-facing operations
    // =====================================================================

    /// Record a client deposit: mints claims 1:1 immediately and records
    /// the amount into the account's ACTIVE batch (opened on demand).
    /// Returns the batch the deposit landed in.
    pub fn deposit(
        &mut self,
        caller: &CapabilitySet,
        account: AccountId,
        asset: &str,
        amount: Decimal,
    ) -> Result<BatchId> {
        caller.require(Capability::RecordEntries)?;
        ensure_positive(amount)?;
        self.accounts.role(account)?;
        let now = Utc::now();
        let batch = self.active_batch_or_open(account, asset, now)?;
        self.ledger.record_deposit(account, asset, amount, batch)?;
        self.supply.mint(asset, amount);
        info!(%account, asset, %amount, %batch, "deposit recorded, claims minted");
        Ok(batch)
    }

    /// Record a redemption request against the owner's ACTIVE batch.
    /// Claims are burned at fulfillment, not here.
    pub fn request_redemption(
        &mut self,
        caller: &CapabilitySet,
        owner: AccountId,
        asset: &str,
        amount: Decimal,
        recipient: AccountId,
    ) -> Result<RequestId> {
        caller.require(Capability::RecordEntries)?;
        ensure_positive(amount)?;
        self.accounts.role(owner)?;
        let now = Utc::now();
        let batch = self.active_batch_or_open(owner, asset, now)?;
        self.ledger
            .record_withdrawal_request(owner, asset, amount, batch)?;
        let id = self
            .requests
            .submit(RequestKind::Redeem, owner, asset, amount, batch, recipient, now);
        Ok(id)
    }

    /// Cancel a PENDING request while its batch is still ACTIVE, reversing
    /// the ledger entry it recorded.
    pub fn cancel_request(&mut self, caller: &CapabilitySet, request: RequestId) -> Result<()> {
        caller.require(Capability::RecordEntries)?;
        let req = self.pending_request(request)?.clone();
        self.batches.ensure_status(req.batch, BatchStatus::Active)?;
        match req.kind {
            RequestKind::Redeem => {
                self.ledger
                    .reverse_withdrawal_request(req.owner, req.amount, req.batch)?;
            }
            // Stake deposits were recorded against the vault (the recipient).
            RequestKind::Stake => {
                self.ledger
                    .reverse_deposit(req.recipient, req.amount, req.batch)?;
            }
            // Unstake records no ledger entry until fulfillment.
            RequestKind::Unstake => {}
        }
        self.requests.mark_cancelled(request)
    }

    /// Fulfill a redemption after its batch settled: release escrowed funds
    /// from the batch receiver and burn the redeemed claims.
    ///
    /// Permissionless — proceeds always go to the request's recipient.
    pub fn fulfill_redemption(&mut self, request: RequestId) -> Result<()> {
        let req = self.pending_request(request)?.clone();
        ensure_kind(&req, RequestKind::Redeem)?;
        self.batches.ensure_status(req.batch, BatchStatus::Settled)?;
        // Pre-check the burn so a release never strands claims.
        let outstanding = self.supply.outstanding(&req.asset);
        if req.amount > outstanding {
            return Err(VaultclearError::SupplyUnderflow {
                asset: req.asset.clone(),
                burn: req.amount,
                outstanding,
            });
        }
        self.receivers
            .release(req.owner, req.batch, &req.asset, req.amount)?;
        self.supply.burn(&req.asset, req.amount)?;
        self.requests.mark_fulfilled(request)?;
        info!(
            %request, recipient = %req.recipient, asset = %req.asset, amount = %req.amount,
            "redemption fulfilled"
        );
        Ok(())
    }

    // =====================================================================
    // Vault-facing operations
    // =====================================================================

    /// Record a stake: assets deposited into the vault's ACTIVE batch,
    /// converted to shares at the batch's settlement price on claim.
    pub fn request_stake(
        &mut self,
        caller: &CapabilitySet,
        staker: AccountId,
        vault: AccountId,
        asset: &str,
        amount: Decimal,
    ) -> Result<RequestId> {
        caller.require(Capability::RecordEntries)?;
        ensure_positive(amount)?;
        self.ensure_vault(vault)?;
        let now = Utc::now();
        let batch = self.active_batch_or_open(vault, asset, now)?;
        self.ledger.record_deposit(vault, asset, amount, batch)?;
        let id = self
            .requests
            .submit(RequestKind::Stake, staker, asset, amount, batch, vault, now);
        Ok(id)
    }

    /// Convert a settled stake into vault shares at the batch's settlement
    /// price. Permissionless. Returns the shares minted.
    ///
    /// Shares are tracked in aggregate per vault; apportioning them to
    /// individual stakers is the responsibility of the token layer in
    /// front of this core.
    pub fn claim_staked_shares(&mut self, request: RequestId) -> Result<Decimal> {
        let req = self.pending_request(request)?.clone();
        ensure_kind(&req, RequestKind::Stake)?;
        self.batches.ensure_status(req.batch, BatchStatus::Settled)?;
        let price = self.settlement_price(req.batch)?;
        let shares = req.amount / price;
        self.supply.mint_shares(req.recipient, shares);
        self.requests.mark_fulfilled(request)?;
        info!(%request, vault = %req.recipient, %shares, %price, "stake claimed");
        Ok(shares)
    }

    /// Record an unstake of `shares` from a vault, bound to the vault's
    /// ACTIVE batch. No ledger entry moves here; the asset side is priced
    /// and reconciled when that batch settles.
    ///
    /// Validated against the vault's aggregate share supply only: the
    /// token layer in front of this core is responsible for checking that
    /// the staker actually owns the shares being unstaked.
    pub fn request_unstake(
        &mut self,
        caller: &CapabilitySet,
        staker: AccountId,
        vault: AccountId,
        asset: &str,
        shares: Decimal,
    ) -> Result<RequestId> {
        caller.require(Capability::RecordEntries)?;
        ensure_positive(shares)?;
        self.ensure_vault(vault)?;
        if shares > self.supply.share_supply(vault) {
            return Err(VaultclearError::BalanceUnderflow);
        }
        let now = Utc::now();
        let batch = self.active_batch_or_open(vault, asset, now)?;
        let id = self
            .requests
            .submit(RequestKind::Unstake, staker, asset, shares, batch, vault, now);
        Ok(id)
    }

    /// Convert settled unstaked shares back into assets at the batch's
    /// settlement price. Permissionless. Returns the asset amount due;
    /// the real payout flows through custody at the vault's settlement.
    pub fn claim_unstaked_assets(&mut self, request: RequestId) -> Result<Decimal> {
        let req = self.pending_request(request)?.clone();
        ensure_kind(&req, RequestKind::Unstake)?;
        self.batches.ensure_status(req.batch, BatchStatus::Settled)?;
        let price = self.settlement_price(req.batch)?;
        let assets = req.amount * price;
        self.supply.burn_shares(req.recipient, req.amount)?;
        self.requests.mark_fulfilled(request)?;
        info!(%request, vault = %req.recipient, shares = %req.amount, %assets, "unstake claimed");
        Ok(assets)
    }

    // =====================================================================
    // Transfers
    // =====================================================================

    /// Move virtual balance from `source` to `target` under the source's
    /// ACTIVE batch.
    pub fn transfer(
        &mut self,
        caller: &CapabilitySet,
        source: AccountId,
        target: AccountId,
        asset: &str,
        amount: Decimal,
    ) -> Result<()> {
        caller.require(Capability::Transfer)?;
        ensure_positive(amount)?;
        self.accounts.role(source)?;
        self.accounts.role(target)?;
        let batch = self.active_batch_or_open(source, asset, Utc::now())?;
        TransferCoordinator::allocate(&mut self.ledger, source, target, asset, amount, batch)
    }

    /// Pull back a gateway's redemption shortfall from its paired vault.
    /// Returns the amount pulled (zero when fully covered).
    pub fn peg_protect(
        &mut self,
        caller: &CapabilitySet,
        gateway: AccountId,
        asset: &str,
    ) -> Result<Decimal> {
        caller.require(Capability::Transfer)?;
        let vault = self
            .accounts
            .paired_vault(gateway, asset)
            .ok_or_else(|| {
                VaultclearError::Configuration(format!(
                    "gateway {gateway} has no paired vault for {asset}"
                ))
            })?;
        let batch = self.active_batch_or_open(gateway, asset, Utc::now())?;
        TransferCoordinator::peg_protect(&mut self.ledger, gateway, vault, asset, batch)
    }

    // =====================================================================
    // Settlement
    // =====================================================================

    /// Propose settlement of a CLOSED batch against `reported_total`.
    pub fn propose_settlement(
        &mut self,
        caller: &CapabilitySet,
        account: AccountId,
        asset: &str,
        batch: BatchId,
        reported_total: Decimal,
    ) -> Result<ProposalId> {
        caller.require(Capability::Propose)?;
        self.engine.propose(
            &self.ledger,
            &self.batches,
            &self.accounts,
            account,
            asset,
            batch,
            reported_total,
            Utc::now(),
        )
    }

    /// Execute a pending proposal once its cooldown has elapsed.
    /// Permissionless.
    pub fn execute_settlement(&mut self, proposal: ProposalId) -> Result<()> {
        self.engine.execute(
            &mut self.ledger,
            &mut self.batches,
            &mut self.receivers,
            &mut self.supply,
            &mut self.custody,
            &self.accounts,
            proposal,
            Utc::now(),
        )
    }

    /// Cancel a pending proposal before its cooldown elapses (guardian).
    pub fn cancel_settlement(
        &mut self,
        caller: &CapabilitySet,
        proposal: ProposalId,
    ) -> Result<()> {
        caller.require(Capability::CancelProposal)?;
        self.engine.cancel(proposal, Utc::now())
    }

    // =====================================================================
    // Invariants
    // =====================================================================

    /// Verify the backing guarantee for an asset against an externally
    /// attested custody total:
    /// `total settled virtual + custody_total ≥ outstanding claims`.
    pub fn verify_backing(&self, asset: &str, custody_total: Decimal) -> Result<()> {
        self.supply
            .verify_backing(asset, self.ledger.total_settled(asset), custody_total)
    }

    // =====================================================================
    // Queries
    // =====================================================================

    /// Settled virtual balance for (account, asset).
    #[must_use]
    pub fn settled_balance(&self, account: AccountId, asset: &str) -> Decimal {
        self.ledger.settled(account, asset)
    }

    /// Pending balances for (account, batch).
    #[must_use]
    pub fn batch_balances(&self, account: AccountId, batch: BatchId) -> BatchBalance {
        self.ledger.batch_balances(account, batch)
    }

    /// Batch metadata.
    #[must_use]
    pub fn batch(&self, batch: BatchId) -> Option<&Batch> {
        self.batches.get(batch)
    }

    /// The ACTIVE batch for (account, asset), if one is open.
    #[must_use]
    pub fn active_batch(&self, account: AccountId, asset: &str) -> Option<BatchId> {
        self.batches.active_batch(account, asset)
    }

    /// Outstanding claim supply for an asset.
    #[must_use]
    pub fn outstanding_claims(&self, asset: &str) -> Decimal {
        self.supply.outstanding(asset)
    }

    /// Outstanding share supply for a vault.
    #[must_use]
    pub fn share_supply(&self, vault: AccountId) -> Decimal {
        self.supply.share_supply(vault)
    }

    /// Request lookup (pending or terminal).
    #[must_use]
    pub fn request(&self, request: RequestId) -> Option<&Request> {
        self.requests.get(request)
    }

    /// Proposal lookup (pending or terminal).
    #[must_use]
    pub fn proposal(&self, proposal: ProposalId) -> Option<&SettlementProposal> {
        self.engine.get(proposal)
    }

    /// Receiver lookup by its `(account, batch, asset)` key.
    #[must_use]
    pub fn receiver(&self, account: AccountId, batch: BatchId, asset: &str) -> Option<&BatchReceiver> {
        self.receivers.get_by_key(account, batch, asset)
    }

    /// Account metadata.
    #[must_use]
    pub fn account(&self, account: AccountId) -> Option<&AccountInfo> {
        self.accounts.get(account)
    }

    /// The vault paired with a gateway for an asset.
    #[must_use]
    pub fn paired_vault(&self, gateway: AccountId, asset: &str) -> Option<AccountId> {
        self.accounts.paired_vault(gateway, asset)
    }

    /// The custody adapter (external reporting surface).
    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    // =====================================================================
    // Internal helpers
    // =====================================================================

    fn active_batch_or_open(
        &mut self,
        account: AccountId,
        asset: &str,
        now: DateTime<Utc>,
    ) -> Result<BatchId> {
        match self.batches.active_batch(account, asset) {
            Some(batch) => Ok(batch),
            None => self.batches.create_batch(account, asset, now),
        }
    }

    fn pending_request(&self, request: RequestId) -> Result<&Request> {
        let req = self
            .requests
            .get(request)
            .ok_or(VaultclearError::RequestNotFound(request))?;
        if !req.is_pending() {
            return Err(VaultclearError::RequestStateError {
                request,
                actual: req.status,
                reason: "request is already terminal".to_string(),
            });
        }
        Ok(req)
    }

    fn ensure_vault(&self, vault: AccountId) -> Result<()> {
        if self.accounts.role(vault)? != AccountRole::Vault {
            return Err(VaultclearError::Configuration(format!(
                "account {vault} is not a vault"
            )));
        }
        Ok(())
    }

    fn settlement_price(&self, batch: BatchId) -> Result<Decimal> {
        let price = self
            .batches
            .get(batch)
            .and_then(|b| b.settled_price)
            .ok_or_else(|| {
                VaultclearError::Internal(format!("batch {batch} has no settlement price"))
            })?;
        if price <= Decimal::ZERO {
            return Err(VaultclearError::Internal(format!(
                "batch {batch} settled at non-positive price {price}"
            )));
        }
        Ok(price)
    }
}

fn ensure_positive(amount: Decimal) -> Result<()> {
    if amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(VaultclearError::InvalidAmount(amount))
    }
}

fn ensure_kind(req: &Request, kind: RequestKind) -> Result<()> {
    if req.kind == kind {
        Ok(())
    } else {
        Err(VaultclearError::RequestStateError {
            request: req.id,
            actual: req.status,
            reason: format!("expected a {kind} request, got {}", req.kind),
        })
    }
}
