//! # vaultclear-settlement
//!
//! **Settlement Plane**: the two-phase (propose → cooldown → execute)
//! protocol that reconciles virtual ledger state against externally
//! reported real totals.
//!
//! ## Architecture
//!
//! 1. **SettlementEngine**: proposal lifecycle, netting and yield
//!    arithmetic, the timelocked commit, and the guardian cancel valve
//! 2. **CustodyAdapter**: the reporting seam to whatever actually holds
//!    or deploys real assets
//! 3. **ClaimSupply**: outstanding claim and vault-share supply, plus the
//!    1:1 backing invariant checker
//!
//! ## Settlement Flow
//!
//! ```text
//! close_batch → propose(reported_total)   [netted, yield fixed here]
//!             → cooldown (operator review window, guardian may cancel)
//!             → execute                    [commit settled balance,
//!                                          fund receivers / apply yield,
//!                                          mark batch SETTLED]
//! ```
//!
//! This is two-phase-commit-with-timelock, not consensus: the cooldown
//! exists to give human operators a bounded review window before an
//! irreversible accounting change.

pub mod custody;
pub mod engine;
pub mod supply;

pub use custody::{CustodyAdapter, RecordedCustody};
pub use engine::{AccountDirectory, SettlementEngine};
pub use supply::ClaimSupply;
