//! # vaultclear-ledger
//!
//! **Accounting Plane**: the virtual-balance store, batch lifecycle state
//! machine, inter-account transfer coordinator, and per-batch escrow arena.
//!
//! ## Architecture
//!
//! 1. **Ledger**: settled balance per (account, asset) and pending
//!    `{deposited, requested}` per (account, batch)
//! 2. **BatchManager**: ACTIVE → CLOSED → SETTLED lifecycle, at most one
//!    ACTIVE batch per (account, asset)
//! 3. **TransferCoordinator**: atomic virtual reallocation between accounts
//!    (capital allocation and peg protection)
//! 4. **ReceiverArena**: per-batch escrow records funded at settlement,
//!    drawn down by redemption fulfillment
//!
//! ## Intent Flow
//!
//! ```text
//! Gateway → Ledger.record_deposit() / record_withdrawal_request()
//!         → BatchManager.close_batch() → Settlement Plane
//!         → Ledger.commit_settled() + ReceiverArena.fund()
//! ```
//!
//! Nothing in this crate moves real assets — all state is virtual and is
//! reconciled against reported real totals by the settlement plane.

pub mod ledger;
pub mod lifecycle;
pub mod receiver;
pub mod transfer;

pub use ledger::Ledger;
pub use lifecycle::BatchManager;
pub use receiver::ReceiverArena;
pub use transfer::TransferCoordinator;
