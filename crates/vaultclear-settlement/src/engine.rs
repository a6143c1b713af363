//! Two-phase timelocked settlement engine.
//!
//! `propose` fixes the settlement arithmetic for a CLOSED batch against an
//! externally reported real total; after the cooldown, `execute` commits it
//! atomically: the account's settled balance reconciles to the reported
//! figure, the batch's pending entries clear, and the role branch runs
//! (gateway: route net inflow to the paired vault and fund the batch
//! receiver for pending redemptions; vault: mint/burn claim supply by the
//! yield). `cancel` is the guardian's circuit-breaker for an erroneous
//! report, available only inside the cooldown window.
//!
//! Settlement arithmetic, fixed at propose time:
//! ```text
//! netted         = deposited - requested
//! adjusted_total = reported_total - netted
//! vault yield    = adjusted_total - last_settled_total
//! gateway yield  = reported_total - deposited - last_settled_total
//! ```
//!
//! The gateway yield formula differs because gateway redemptions do not
//! leave at settlement: they move into the batch receiver, so the staged
//! assets are still part of the reported total.
//!
//! Commit targets on execute:
//! - vault:   settled = reported_total (assets stay with the account)
//! - gateway: settled = reported_total - max(netted, 0) - requested
//!            (net inflow passes to the vault, redemptions to the
//!            receiver; a net-redemption batch routes nothing)

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};
use vaultclear_ledger::{BatchManager, Ledger, ReceiverArena};
use vaultclear_types::{
    AccountId, AccountRole, BatchId, BatchStatus, ProposalId, ProposalStatus, Result,
    SettlementConfig, SettlementProposal, VaultclearError, constants,
};

use crate::custody::CustodyAdapter;
use crate::supply::ClaimSupply;

/// Resolves account roles and the explicit gateway → vault pairing.
///
/// Implemented by the account registry at the boundary; the pairing is a
/// queryable relation, not a positional convention.
pub trait AccountDirectory {
    /// The role of a registered account.
    ///
    /// # Errors
    /// Returns `AccountNotFound` for unregistered accounts.
    fn role(&self, account: AccountId) -> Result<AccountRole>;

    /// The vault paired with a gateway for a given asset, if registered.
    fn paired_vault(&self, gateway: AccountId, asset: &str) -> Option<AccountId>;
}

/// Owns all settlement proposals and drives the two-phase protocol.
pub struct SettlementEngine {
    config: SettlementConfig,
    /// All proposals, pending and historical.
    proposals: HashMap<ProposalId, SettlementProposal>,
    /// The single PENDING proposal per (account, batch), if any.
    pending_slot: HashMap<(AccountId, BatchId), ProposalId>,
}

impl SettlementEngine {
    /// Create an engine with the given configuration.
    #[must_use]
    pub fn new(config: SettlementConfig) -> Self {
        Self {
            config,
            proposals: HashMap::new(),
            pending_slot: HashMap::new(),
        }
    }

    /// Propose settlement of a CLOSED batch against `reported_total`.
    ///
    /// Fixes `netted`, `yield`, and the pending-balance snapshot; nothing
    /// in the ledger changes until `execute`.
    ///
    /// # Errors
    /// - `BatchNotFound` / `BatchStateError` if the batch is missing,
    ///   belongs to a different (account, asset), or is not CLOSED
    /// - `ProposalConflict` if a PENDING proposal already holds the slot
    /// - `BalanceUnderflow` if committing would drive the settled balance
    ///   negative
    /// - `YieldToleranceExceeded` if `|yield|` breaches the configured
    ///   ceiling relative to the prior settled total
    #[allow(clippy::too_many_arguments)]
    pub fn propose(
        &mut self,
        ledger: &Ledger,
        batches: &BatchManager,
        directory: &dyn AccountDirectory,
        account: AccountId,
        asset: &str,
        batch: BatchId,
        reported_total: Decimal,
        now: DateTime<Utc>,
    ) -> Result<ProposalId> {
        let entry = batches
            .get(batch)
            .ok_or(VaultclearError::BatchNotFound(batch))?;
        if entry.account != account || entry.asset != asset {
            // No such batch under this (account, asset).
            return Err(VaultclearError::BatchNotFound(batch));
        }
        batches.ensure_status(batch, BatchStatus::Closed)?;

        if let Some(existing) = self.pending_slot.get(&(account, batch)) {
            return Err(VaultclearError::ProposalConflict {
                batch,
                existing: *existing,
            });
        }

        let snapshot = ledger.batch_balances(account, batch);
        let netted = snapshot.netted();
        let last_total = ledger.settled(account, asset);
        let adjusted_total = reported_total - netted;

        // Commit target and yield attribution depend on the role: a
        // vault's withdrawals leave with the settlement, while a gateway's
        // redemptions only leave through the batch receiver and so are
        // still part of the reported total.
        let (commit_target, yield_delta) = match directory.role(account)? {
            AccountRole::Vault => (reported_total, adjusted_total - last_total),
            AccountRole::Gateway => (
                reported_total - netted.max(Decimal::ZERO) - snapshot.requested,
                reported_total - last_total - snapshot.deposited,
            ),
        };
        let is_profit = yield_delta >= Decimal::ZERO;
        if commit_target < Decimal::ZERO {
            return Err(VaultclearError::BalanceUnderflow);
        }

        if let Some(tolerance_bps) = self.config.yield_tolerance_bps {
            if last_total > Decimal::ZERO
                && yield_delta.abs() * Decimal::from(constants::BPS_DENOMINATOR)
                    > last_total * Decimal::from(tolerance_bps)
            {
                warn!(%account, %batch, %yield_delta, %last_total, "yield tolerance breached");
                return Err(VaultclearError::YieldToleranceExceeded {
                    yield_delta,
                    last_total,
                    tolerance_bps,
                });
            }
        }

        let id = ProposalId::new();
        let proposal = SettlementProposal {
            id,
            account,
            asset: asset.to_string(),
            batch,
            reported_total,
            last_total,
            netted,
            yield_delta,
            is_profit,
            adjusted_total,
            snapshot,
            proposed_at: now,
            execute_after: now + self.config.cooldown,
            status: ProposalStatus::Pending,
        };
        info!(
            proposal = %id, %account, %batch, %reported_total, %netted, %yield_delta,
            execute_after = %proposal.execute_after, "settlement proposed"
        );
        self.proposals.insert(id, proposal);
        self.pending_slot.insert((account, batch), id);
        Ok(id)
    }

    /// Execute a PENDING proposal after its cooldown has elapsed.
    ///
    /// All validation runs before any mutation; on error the ledger,
    /// batch, receivers, and supply are untouched.
    ///
    /// Transfers recorded under the batch settle with it: each
    /// counterparty's net flow is credited to its settled balance, and the
    /// outbound-transfer portion of `requested` is excluded from the
    /// redemption receiver's escrow.
    ///
    /// # Errors
    /// - `ProposalNotFound` / `ProposalStateError` for missing or
    ///   non-PENDING proposals
    /// - `CooldownNotElapsed` before `execute_after`
    /// - `BatchMutatedSinceProposal` if pending balances moved since the
    ///   snapshot (defensive check)
    /// - `SettledBalanceChanged` if another account's settlement credited
    ///   this balance since the snapshot; the proposal is cancelled and
    ///   the slot freed for a fresh one
    /// - `Configuration` if a gateway with net inflow has no paired vault
    /// - `SupplyUnderflow` if a vault loss exceeds outstanding claims
    #[allow(clippy::too_many_arguments)]
    pub fn execute(
        &mut self,
        ledger: &mut Ledger,
        batches: &mut BatchManager,
        receivers: &mut ReceiverArena,
        supply: &mut ClaimSupply,
        custody: &mut dyn CustodyAdapter,
        directory: &dyn AccountDirectory,
        proposal_id: ProposalId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let proposal = self
            .proposals
            .get(&proposal_id)
            .ok_or(VaultclearError::ProposalNotFound(proposal_id))?
            .clone();

        if proposal.status != ProposalStatus::Pending {
            return Err(VaultclearError::ProposalStateError {
                proposal: proposal_id,
                actual: proposal.status,
                reason: "only PENDING proposals can be executed".to_string(),
            });
        }
        if !proposal.cooldown_elapsed(now) {
            return Err(VaultclearError::CooldownNotElapsed {
                execute_after: proposal.execute_after,
            });
        }

        let account = proposal.account;
        let asset = proposal.asset.as_str();
        let batch = proposal.batch;

        // Defensive: the batch must still be CLOSED with the exact pending
        // balances that were snapshotted at propose time.
        batches.ensure_status(batch, BatchStatus::Closed)?;
        if ledger.batch_balances(account, batch) != proposal.snapshot {
            return Err(VaultclearError::BatchMutatedSinceProposal(batch));
        }

        // Another account's settlement may have credited this balance
        // since the snapshot (routing or sweep). Committing the reviewed
        // figure would overwrite that credit, so the proposal is cancelled
        // to free the slot for a fresh one against the new baseline.
        let current_total = ledger.settled(account, asset);
        if current_total != proposal.last_total {
            let stored = self
                .proposals
                .get_mut(&proposal_id)
                .ok_or(VaultclearError::ProposalNotFound(proposal_id))?;
            stored.status = ProposalStatus::Cancelled;
            self.pending_slot.remove(&(account, batch));
            warn!(
                proposal = %proposal_id, %account, %batch,
                snapshot = %proposal.last_total, actual = %current_total,
                "settled balance changed since proposal, cancelling"
            );
            return Err(VaultclearError::SettledBalanceChanged {
                proposal: proposal_id,
                snapshot: proposal.last_total,
                actual: current_total,
            });
        }

        // Transfers recorded under this batch left pending entries on other
        // accounts; they settle now, with this batch. Validate each sweep
        // before anything moves.
        let counterparties = ledger.counterparty_pending(batch, account);
        for (cp, bal) in &counterparties {
            if ledger.settled(*cp, asset) + bal.netted() < Decimal::ZERO {
                return Err(VaultclearError::BalanceUnderflow);
            }
        }

        let role = directory.role(account)?;
        let paired = if role == AccountRole::Gateway && proposal.netted > Decimal::ZERO {
            Some(
                directory
                    .paired_vault(account, asset)
                    .ok_or_else(|| {
                        VaultclearError::Configuration(format!(
                            "gateway {account} has no paired vault for {asset}"
                        ))
                    })?,
            )
        } else {
            None
        };
        // Vault loss must be coverable by outstanding supply before any
        // state moves.
        if role == AccountRole::Vault
            && !proposal.is_profit
            && proposal.yield_delta.abs() > supply.outstanding(asset)
        {
            return Err(VaultclearError::SupplyUnderflow {
                asset: asset.to_string(),
                burn: proposal.yield_delta.abs(),
                outstanding: supply.outstanding(asset),
            });
        }

        // --- Commit point: no fallible operations below may be reached
        // with a violated precondition. ---
        ledger.take_pending(account, batch);
        // Outbound transfers are part of `requested` but are paid through
        // the counterparty sweep, not the redemption receiver.
        let transfers_out: Decimal = counterparties.iter().map(|(_, bal)| bal.deposited).sum();
        for (cp, bal) in ledger.take_counterparty_pending(batch, account) {
            ledger.credit_settled(cp, asset, bal.netted());
        }
        let settled_price = match role {
            AccountRole::Vault => {
                ledger.commit_settled(account, asset, proposal.reported_total)?;
                if proposal.is_profit {
                    supply.mint(asset, proposal.yield_delta);
                } else {
                    supply.burn(asset, proposal.yield_delta.abs())?;
                }
                let shares = supply.share_supply(account);
                if shares > Decimal::ZERO {
                    proposal.reported_total / shares
                } else {
                    Decimal::ONE
                }
            }
            AccountRole::Gateway => {
                let routed = proposal.netted.max(Decimal::ZERO);
                let commit = proposal.reported_total - routed - proposal.snapshot.requested;
                ledger.commit_settled(account, asset, commit)?;
                if let Some(vault) = paired {
                    ledger.credit_settled(vault, asset, routed);
                }
                let escrow = proposal.snapshot.requested - transfers_out;
                if escrow > Decimal::ZERO {
                    receivers.create(account, batch, asset, now)?;
                    receivers.fund(account, batch, asset, escrow)?;
                }
                Decimal::ONE
            }
        };

        batches.mark_settled(batch, settled_price, now)?;
        custody.set_reported_total(account, asset, ledger.settled(account, asset));

        let stored = self
            .proposals
            .get_mut(&proposal_id)
            .ok_or(VaultclearError::ProposalNotFound(proposal_id))?;
        stored.status = ProposalStatus::Executed;
        self.pending_slot.remove(&(account, batch));

        info!(
            proposal = %proposal_id, %account, %batch, role = %role,
            settled = %ledger.settled(account, asset), "settlement executed"
        );
        Ok(())
    }

    /// Cancel a PENDING proposal before its cooldown elapses.
    ///
    /// Frees the (account, batch) slot for a fresh proposal. The caller
    /// must hold the guardian capability — checked at the boundary.
    ///
    /// # Errors
    /// - `ProposalNotFound` for unknown proposals
    /// - `ProposalStateError` if not PENDING or the window already closed
    pub fn cancel(&mut self, proposal_id: ProposalId, now: DateTime<Utc>) -> Result<()> {
        let proposal = self
            .proposals
            .get_mut(&proposal_id)
            .ok_or(VaultclearError::ProposalNotFound(proposal_id))?;
        if proposal.status != ProposalStatus::Pending {
            return Err(VaultclearError::ProposalStateError {
                proposal: proposal_id,
                actual: proposal.status,
                reason: "only PENDING proposals can be cancelled".to_string(),
            });
        }
        if proposal.cooldown_elapsed(now) {
            return Err(VaultclearError::ProposalStateError {
                proposal: proposal_id,
                actual: proposal.status,
                reason: format!(
                    "cancellation window closed at {}",
                    proposal.execute_after
                ),
            });
        }
        proposal.status = ProposalStatus::Cancelled;
        let slot = (proposal.account, proposal.batch);
        self.pending_slot.remove(&slot);
        warn!(proposal = %proposal_id, batch = %proposal.batch, "settlement proposal cancelled");
        Ok(())
    }

    /// Look up a proposal by id (pending or historical).
    #[must_use]
    pub fn get(&self, proposal_id: ProposalId) -> Option<&SettlementProposal> {
        self.proposals.get(&proposal_id)
    }

    /// The PENDING proposal currently holding a batch's slot, if any.
    #[must_use]
    pub fn pending_proposal(&self, account: AccountId, batch: BatchId) -> Option<ProposalId> {
        self.pending_slot.get(&(account, batch)).copied()
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Mutable engine configuration (governance-equivalent authority only;
    /// capability-checked at the boundary).
    pub fn config_mut(&mut self) -> &mut SettlementConfig {
        &mut self.config
    }
}

impl Default for SettlementEngine {
    fn default() -> Self {
        Self::new(SettlementConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::RecordedCustody;
    use chrono::Duration;
    use std::time::Duration as StdDuration;

    /// Minimal directory for engine tests: one gateway paired with one vault.
    struct TestDirectory {
        gateway: AccountId,
        vault: AccountId,
    }

    impl AccountDirectory for TestDirectory {
        fn role(&self, account: AccountId) -> Result<AccountRole> {
            if account == self.gateway {
                Ok(AccountRole::Gateway)
            } else if account == self.vault {
                Ok(AccountRole::Vault)
            } else {
                Err(VaultclearError::AccountNotFound(account))
            }
        }

        fn paired_vault(&self, gateway: AccountId, _asset: &str) -> Option<AccountId> {
            (gateway == self.gateway).then_some(self.vault)
        }
    }

    struct Harness {
        ledger: Ledger,
        batches: BatchManager,
        receivers: ReceiverArena,
        supply: ClaimSupply,
        custody: RecordedCustody,
        directory: TestDirectory,
        engine: SettlementEngine,
    }

    fn harness(cooldown_secs: u64) -> Harness {
        let mut ledger = Ledger::new();
        ledger.register_asset("USDC");
        let mut config = SettlementConfig::default();
        config
            .set_cooldown(StdDuration::from_secs(cooldown_secs))
            .unwrap();
        Harness {
            ledger,
            batches: BatchManager::new(),
            receivers: ReceiverArena::new(),
            supply: ClaimSupply::new(),
            custody: RecordedCustody::new(),
            directory: TestDirectory {
                gateway: AccountId::new(),
                vault: AccountId::new(),
            },
            engine: SettlementEngine::new(config),
        }
    }

    fn closed_vault_batch(h: &mut Harness, deposited: i64, requested: i64) -> BatchId {
        let now = Utc::now();
        let vault = h.directory.vault;
        let batch = h.batches.create_batch(vault, "USDC", now).unwrap();
        if deposited > 0 {
            h.ledger
                .record_deposit(vault, "USDC", Decimal::new(deposited, 0), batch)
                .unwrap();
        }
        if requested > 0 {
            h.ledger
                .record_withdrawal_request(vault, "USDC", Decimal::new(requested, 0), batch)
                .unwrap();
        }
        h.batches.close_batch(batch, false, now).unwrap();
        batch
    }

    fn execute(h: &mut Harness, id: ProposalId, now: DateTime<Utc>) -> Result<()> {
        h.engine.execute(
            &mut h.ledger,
            &mut h.batches,
            &mut h.receivers,
            &mut h.supply,
            &mut h.custody,
            &h.directory,
            id,
            now,
        )
    }

    #[test]
    fn deposit_only_batch_settles_to_reported() {
        // D=1000, R=0, reported=1000: netted=1000, yield=0, settled=1000.
        let mut h = harness(0);
        let vault = h.directory.vault;
        let batch = closed_vault_batch(&mut h, 1000, 0);
        let now = Utc::now();

        let id = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                vault,
                "USDC",
                batch,
                Decimal::new(1000, 0),
                now,
            )
            .unwrap();
        let prop = h.engine.get(id).unwrap();
        assert_eq!(prop.netted, Decimal::new(1000, 0));
        assert_eq!(prop.yield_delta, Decimal::ZERO);
        assert!(prop.is_profit);

        execute(&mut h, id, now).unwrap();
        assert_eq!(h.ledger.settled(vault, "USDC"), Decimal::new(1000, 0));
        assert_eq!(
            h.batches.status(batch).unwrap(),
            BatchStatus::Settled
        );
        // Pending entries cleared.
        assert!(h.ledger.batch_balances(vault, batch).is_zero());
        // Custody notified of the new baseline.
        assert_eq!(
            h.custody.total_assets(vault, "USDC"),
            Decimal::new(1000, 0)
        );
    }

    #[test]
    fn profit_mints_claim_supply() {
        // D=1000, R=400, reported=700: netted=600, yield=700-600-0=100
        // profit, +100 to supply.
        let mut h = harness(0);
        let vault = h.directory.vault;
        let batch = closed_vault_batch(&mut h, 1000, 400);
        let now = Utc::now();

        let id = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                vault,
                "USDC",
                batch,
                Decimal::new(700, 0),
                now,
            )
            .unwrap();
        let prop = h.engine.get(id).unwrap();
        assert_eq!(prop.netted, Decimal::new(600, 0));
        assert_eq!(prop.yield_delta, Decimal::new(100, 0));

        execute(&mut h, id, now).unwrap();
        assert_eq!(h.supply.outstanding("USDC"), Decimal::new(100, 0));
        assert_eq!(h.ledger.settled(vault, "USDC"), Decimal::new(700, 0));
    }

    #[test]
    fn loss_burns_claim_supply() {
        let mut h = harness(0);
        let vault = h.directory.vault;
        h.supply.mint("USDC", Decimal::new(1000, 0));
        h.ledger
            .commit_settled(vault, "USDC", Decimal::new(1000, 0))
            .unwrap();
        let batch = closed_vault_batch(&mut h, 0, 0);
        let now = Utc::now();

        // No flow, reported drops to 950: yield = -50.
        let id = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                vault,
                "USDC",
                batch,
                Decimal::new(950, 0),
                now,
            )
            .unwrap();
        let prop = h.engine.get(id).unwrap();
        assert_eq!(prop.yield_delta, Decimal::new(-50, 0));
        assert!(!prop.is_profit);

        execute(&mut h, id, now).unwrap();
        assert_eq!(h.supply.outstanding("USDC"), Decimal::new(950, 0));
        assert_eq!(h.ledger.settled(vault, "USDC"), Decimal::new(950, 0));
    }

    #[test]
    fn propose_requires_closed_batch() {
        let mut h = harness(0);
        let vault = h.directory.vault;
        let now = Utc::now();
        let batch = h.batches.create_batch(vault, "USDC", now).unwrap();

        let err = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                vault,
                "USDC",
                batch,
                Decimal::ZERO,
                now,
            )
            .unwrap_err();
        assert!(matches!(err, VaultclearError::BatchStateError { .. }));
    }

    #[test]
    fn duplicate_pending_proposal_rejected() {
        let mut h = harness(3600);
        let vault = h.directory.vault;
        let batch = closed_vault_batch(&mut h, 100, 0);
        let now = Utc::now();

        h.engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                vault,
                "USDC",
                batch,
                Decimal::new(100, 0),
                now,
            )
            .unwrap();
        let err = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                vault,
                "USDC",
                batch,
                Decimal::new(100, 0),
                now,
            )
            .unwrap_err();
        assert!(matches!(err, VaultclearError::ProposalConflict { .. }));
    }

    #[test]
    fn cooldown_blocks_until_boundary() {
        let mut h = harness(3600);
        let vault = h.directory.vault;
        let batch = closed_vault_batch(&mut h, 100, 0);
        let now = Utc::now();

        let id = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                vault,
                "USDC",
                batch,
                Decimal::new(100, 0),
                now,
            )
            .unwrap();

        let err = execute(&mut h, id, now).unwrap_err();
        assert!(matches!(err, VaultclearError::CooldownNotElapsed { .. }));
        let err = execute(&mut h, id, now + Duration::minutes(59)).unwrap_err();
        assert!(matches!(err, VaultclearError::CooldownNotElapsed { .. }));

        // Exactly at the boundary: succeeds.
        execute(&mut h, id, now + Duration::hours(1)).unwrap();
        assert_eq!(h.ledger.settled(vault, "USDC"), Decimal::new(100, 0));
    }

    #[test]
    fn double_execute_rejected() {
        let mut h = harness(0);
        let vault = h.directory.vault;
        let batch = closed_vault_batch(&mut h, 100, 0);
        let now = Utc::now();

        let id = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                vault,
                "USDC",
                batch,
                Decimal::new(100, 0),
                now,
            )
            .unwrap();
        execute(&mut h, id, now).unwrap();

        let err = execute(&mut h, id, now).unwrap_err();
        assert!(matches!(err, VaultclearError::ProposalStateError { .. }));
    }

    #[test]
    fn cancel_releases_slot() {
        let mut h = harness(3600);
        let vault = h.directory.vault;
        let batch = closed_vault_batch(&mut h, 100, 0);
        let now = Utc::now();

        let id = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                vault,
                "USDC",
                batch,
                Decimal::new(999, 0),
                now,
            )
            .unwrap();
        h.engine.cancel(id, now + Duration::minutes(5)).unwrap();
        assert_eq!(h.engine.pending_proposal(vault, batch), None);
        assert_eq!(
            h.engine.get(id).unwrap().status,
            ProposalStatus::Cancelled
        );

        // Slot is free: a corrected proposal succeeds.
        let id2 = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                vault,
                "USDC",
                batch,
                Decimal::new(100, 0),
                now,
            )
            .unwrap();
        assert_ne!(id, id2);
    }

    #[test]
    fn cancel_after_window_rejected() {
        let mut h = harness(3600);
        let vault = h.directory.vault;
        let batch = closed_vault_batch(&mut h, 100, 0);
        let now = Utc::now();

        let id = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                vault,
                "USDC",
                batch,
                Decimal::new(100, 0),
                now,
            )
            .unwrap();
        let err = h.engine.cancel(id, now + Duration::hours(2)).unwrap_err();
        assert!(matches!(err, VaultclearError::ProposalStateError { .. }));
    }

    #[test]
    fn yield_tolerance_rejects_outlier_report() {
        let mut h = harness(0);
        let vault = h.directory.vault;
        h.ledger
            .commit_settled(vault, "USDC", Decimal::new(1000, 0))
            .unwrap();
        let batch = closed_vault_batch(&mut h, 0, 0);
        let now = Utc::now();

        // Default tolerance 10%: a 101-over report (10.1%) is rejected.
        let err = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                vault,
                "USDC",
                batch,
                Decimal::new(1101, 0),
                now,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            VaultclearError::YieldToleranceExceeded { .. }
        ));
        // Ledger unchanged; slot still free for a corrected figure.
        assert_eq!(h.ledger.settled(vault, "USDC"), Decimal::new(1000, 0));
        h.engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                vault,
                "USDC",
                batch,
                Decimal::new(1100, 0),
                now,
            )
            .unwrap();
    }

    #[test]
    fn zero_activity_batch_settles() {
        let mut h = harness(0);
        let vault = h.directory.vault;
        let batch = closed_vault_batch(&mut h, 0, 0);
        let now = Utc::now();

        let id = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                vault,
                "USDC",
                batch,
                Decimal::ZERO,
                now,
            )
            .unwrap();
        assert_eq!(h.engine.get(id).unwrap().netted, Decimal::ZERO);
        execute(&mut h, id, now).unwrap();
        assert_eq!(h.batches.status(batch).unwrap(), BatchStatus::Settled);
    }

    #[test]
    fn batch_mutation_after_proposal_detected() {
        let mut h = harness(0);
        let vault = h.directory.vault;
        let batch = closed_vault_batch(&mut h, 100, 0);
        let now = Utc::now();

        let id = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                vault,
                "USDC",
                batch,
                Decimal::new(100, 0),
                now,
            )
            .unwrap();
        // A stray write lands after the snapshot (should be impossible for
        // a CLOSED batch through the boundary, hence defensive).
        h.ledger
            .record_deposit(vault, "USDC", Decimal::ONE, batch)
            .unwrap();

        let err = execute(&mut h, id, now).unwrap_err();
        assert!(matches!(
            err,
            VaultclearError::BatchMutatedSinceProposal(_)
        ));
    }

    #[test]
    fn transfer_counterparty_settles_with_the_batch() {
        // Vault A holds 1000 settled and transfers 300 to vault... here the
        // counterparty is the gateway for directory simplicity; the sweep
        // is role-agnostic.
        let mut h = harness(0);
        let vault = h.directory.vault;
        let gateway = h.directory.gateway;
        h.ledger
            .commit_settled(vault, "USDC", Decimal::new(1000, 0))
            .unwrap();
        let now = Utc::now();
        let batch = h.batches.create_batch(vault, "USDC", now).unwrap();
        h.ledger
            .transfer(vault, gateway, "USDC", Decimal::new(300, 0), batch)
            .unwrap();
        h.batches.close_batch(batch, false, now).unwrap();

        // Real assets followed the transfer: the vault reports 700.
        let id = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                vault,
                "USDC",
                batch,
                Decimal::new(700, 0),
                now,
            )
            .unwrap();
        // netted = -300, so adjusted = 1000 and no yield is attributed.
        let prop = h.engine.get(id).unwrap();
        assert_eq!(prop.netted, Decimal::new(-300, 0));
        assert_eq!(prop.yield_delta, Decimal::ZERO);

        execute(&mut h, id, now).unwrap();
        assert_eq!(h.ledger.settled(vault, "USDC"), Decimal::new(700, 0));
        assert_eq!(h.ledger.settled(gateway, "USDC"), Decimal::new(300, 0));
        assert!(h.ledger.batch_balances(gateway, batch).is_zero());
        // Global sum conserved; supply untouched.
        assert_eq!(h.ledger.total_settled("USDC"), Decimal::new(1000, 0));
        assert_eq!(h.supply.outstanding("USDC"), Decimal::ZERO);
    }

    #[test]
    fn outbound_transfer_not_escrowed_in_receiver() {
        // Gateway batch with 1000 deposits, a 300 allocation to the vault,
        // and a 200 redemption: the receiver escrows only the 200.
        let mut h = harness(0);
        let gateway = h.directory.gateway;
        let vault = h.directory.vault;
        let now = Utc::now();
        let batch = h.batches.create_batch(gateway, "USDC", now).unwrap();
        h.ledger
            .record_deposit(gateway, "USDC", Decimal::new(1000, 0), batch)
            .unwrap();
        h.ledger
            .transfer(gateway, vault, "USDC", Decimal::new(300, 0), batch)
            .unwrap();
        h.ledger
            .record_withdrawal_request(gateway, "USDC", Decimal::new(200, 0), batch)
            .unwrap();
        h.batches.close_batch(batch, false, now).unwrap();

        let id = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                gateway,
                "USDC",
                batch,
                Decimal::new(1000, 0),
                now,
            )
            .unwrap();
        execute(&mut h, id, now).unwrap();

        // netted = 1000 - 500 = 500 routed to the paired vault, plus the
        // 300 swept from the transfer.
        assert_eq!(h.ledger.settled(vault, "USDC"), Decimal::new(800, 0));
        assert_eq!(h.ledger.settled(gateway, "USDC"), Decimal::ZERO);
        let recv = h.receivers.get_by_key(gateway, batch, "USDC").unwrap();
        assert_eq!(recv.funded, Decimal::new(200, 0));
        assert_eq!(h.ledger.total_settled("USDC"), Decimal::new(800, 0));
    }

    #[test]
    fn gateway_net_redemption_funds_receiver_from_settled_balance() {
        // The gateway retains 300 settled; a batch of pure redemptions
        // (D=0, R=300) moves exactly that into the receiver. No yield is
        // attributed and nothing is minted.
        let mut h = harness(0);
        let gateway = h.directory.gateway;
        h.ledger
            .commit_settled(gateway, "USDC", Decimal::new(300, 0))
            .unwrap();
        let now = Utc::now();
        let batch = h.batches.create_batch(gateway, "USDC", now).unwrap();
        h.ledger
            .record_withdrawal_request(gateway, "USDC", Decimal::new(300, 0), batch)
            .unwrap();
        h.batches.close_batch(batch, false, now).unwrap();

        // The staged redemption assets are still at the gateway, so the
        // report matches the prior settled balance. Default tolerance is
        // active: zero yield must be attributed for this to pass.
        let id = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                gateway,
                "USDC",
                batch,
                Decimal::new(300, 0),
                now,
            )
            .unwrap();
        assert_eq!(h.engine.get(id).unwrap().yield_delta, Decimal::ZERO);
        execute(&mut h, id, now).unwrap();

        assert_eq!(h.ledger.settled(gateway, "USDC"), Decimal::ZERO);
        let recv = h.receivers.get_by_key(gateway, batch, "USDC").unwrap();
        assert_eq!(recv.funded, Decimal::new(300, 0));
        // Conservation: settled plus escrow equals the reported total.
        assert_eq!(
            h.ledger.total_settled("USDC") + recv.funded,
            Decimal::new(300, 0)
        );
    }

    #[test]
    fn stale_proposal_cancelled_after_sweep_credit() {
        let mut h = harness(0);
        let gateway = h.directory.gateway;
        let vault = h.directory.vault;
        let now = Utc::now();
        h.ledger
            .commit_settled(vault, "USDC", Decimal::new(1000, 0))
            .unwrap();

        // The gateway proposes a zero-activity batch first.
        let gb = h.batches.create_batch(gateway, "USDC", now).unwrap();
        h.batches.close_batch(gb, false, now).unwrap();
        let stale = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                gateway,
                "USDC",
                gb,
                Decimal::ZERO,
                now,
            )
            .unwrap();

        // A vault settlement then sweeps a 300 transfer credit to the
        // gateway while that proposal is still pending.
        let vb = h.batches.create_batch(vault, "USDC", now).unwrap();
        h.ledger
            .transfer(vault, gateway, "USDC", Decimal::new(300, 0), vb)
            .unwrap();
        h.batches.close_batch(vb, false, now).unwrap();
        let vp = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                vault,
                "USDC",
                vb,
                Decimal::new(700, 0),
                now,
            )
            .unwrap();
        execute(&mut h, vp, now).unwrap();
        assert_eq!(h.ledger.settled(gateway, "USDC"), Decimal::new(300, 0));

        // Executing the stale proposal must not overwrite the credit: it
        // is rejected, cancelled, and the slot freed.
        let err = execute(&mut h, stale, now).unwrap_err();
        assert!(matches!(err, VaultclearError::SettledBalanceChanged { .. }));
        assert_eq!(
            h.engine.get(stale).unwrap().status,
            ProposalStatus::Cancelled
        );
        assert_eq!(h.engine.pending_proposal(gateway, gb), None);
        assert_eq!(h.ledger.settled(gateway, "USDC"), Decimal::new(300, 0));

        // A fresh proposal against the new baseline settles cleanly and
        // the global sum is conserved.
        let id = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                gateway,
                "USDC",
                gb,
                Decimal::new(300, 0),
                now,
            )
            .unwrap();
        execute(&mut h, id, now).unwrap();
        assert_eq!(h.ledger.settled(gateway, "USDC"), Decimal::new(300, 0));
        assert_eq!(h.ledger.total_settled("USDC"), Decimal::new(1000, 0));
    }

    #[test]
    fn gateway_settlement_routes_inflow_and_funds_receiver() {
        let mut h = harness(0);
        let gateway = h.directory.gateway;
        let vault = h.directory.vault;
        let now = Utc::now();

        let batch = h.batches.create_batch(gateway, "USDC", now).unwrap();
        h.ledger
            .record_deposit(gateway, "USDC", Decimal::new(1000, 0), batch)
            .unwrap();
        h.ledger
            .record_withdrawal_request(gateway, "USDC", Decimal::new(400, 0), batch)
            .unwrap();
        h.batches.close_batch(batch, false, now).unwrap();

        // Pass-through report: deposits arrived, redemptions unpaid.
        let id = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                gateway,
                "USDC",
                batch,
                Decimal::new(1000, 0),
                now,
            )
            .unwrap();
        execute(&mut h, id, now).unwrap();

        // Net inflow (600) routed to the paired vault; redemption assets
        // (400) escrowed in the batch receiver; gateway keeps the rest (0).
        assert_eq!(h.ledger.settled(vault, "USDC"), Decimal::new(600, 0));
        assert_eq!(h.ledger.settled(gateway, "USDC"), Decimal::ZERO);
        let recv = h.receivers.get_by_key(gateway, batch, "USDC").unwrap();
        assert_eq!(recv.funded, Decimal::new(400, 0));
        assert_eq!(h.batches.status(batch).unwrap(), BatchStatus::Settled);
    }

    #[test]
    fn vault_settlement_records_share_price() {
        let mut h = harness(0);
        let vault = h.directory.vault;
        h.supply.mint_shares(vault, Decimal::new(500, 0));
        let batch = closed_vault_batch(&mut h, 1000, 0);
        let now = Utc::now();

        let id = h
            .engine
            .propose(
                &h.ledger,
                &h.batches,
                &h.directory,
                vault,
                "USDC",
                batch,
                Decimal::new(1000, 0),
                now,
            )
            .unwrap();
        execute(&mut h, id, now).unwrap();

        // 1000 assets over 500 shares: price 2.
        assert_eq!(
            h.batches.get(batch).unwrap().settled_price,
            Some(Decimal::new(2, 0))
        );
    }
}
