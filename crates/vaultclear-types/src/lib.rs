//! # vaultclear-types
//!
//! Shared types, errors, and configuration for the **VaultClear**
//! accounting and settlement core.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`BatchId`], [`ProposalId`], [`RequestId`], [`ReceiverId`]
//! - **Account model**: [`AccountRole`], [`AccountInfo`]
//! - **Batch model**: [`Batch`], [`BatchStatus`], [`BatchBalance`]
//! - **Settlement model**: [`SettlementProposal`], [`ProposalStatus`]
//! - **Request model**: [`Request`], [`RequestKind`], [`RequestStatus`]
//! - **Receiver model**: [`BatchReceiver`]
//! - **Configuration**: [`SettlementConfig`]
//! - **Errors**: [`VaultclearError`] with `VC_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod account;
pub mod balance;
pub mod batch;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod proposal;
pub mod receiver;
pub mod request;

// Re-export all primary types at crate root for ergonomic imports:
//   use vaultclear_types::{Batch, BatchStatus, SettlementProposal, ...};

pub use account::*;
pub use balance::*;
pub use batch::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use proposal::*;
pub use receiver::*;
pub use request::*;

// Constants are accessed via `vaultclear_types::constants::FOO`
// (not re-exported to avoid name collisions).
