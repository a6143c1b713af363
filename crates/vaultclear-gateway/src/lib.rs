//! # vaultclear-gateway
//!
//! **Boundary Plane**: capability-based authorization, the account and
//! request registries, and the `Platform` facade that wires every plane
//! together and serializes top-level operations.
//!
//! ## Architecture
//!
//! 1. **CapabilitySet**: one capability check per operation, at the
//!    boundary and nowhere deeper
//! 2. **AccountRegistry**: account roles and the explicit
//!    `(gateway, asset) → vault` pairing used by settlement routing
//! 3. **RequestRegistry**: redemption/stake/unstake intents bound to the
//!    batch that was ACTIVE at submission
//! 4. **Platform**: owns the ledger, batch manager, receiver arena,
//!    settlement engine, and claim supply; every mutating operation takes
//!    `&mut self` (single-writer, serialized execution)
//!
//! ## Operation Flow
//!
//! ```text
//! caller → CapabilitySet.require() → Platform op
//!        → Ledger / BatchManager / RequestRegistry   (record phase)
//!        → SettlementEngine.propose / execute        (settle phase)
//!        → ReceiverArena.release + ClaimSupply.burn  (fulfill phase)
//! ```
//!
//! Settlement execution and request fulfillment are permissionless — both
//! only commit outcomes that were fixed by earlier privileged steps.

pub mod accounts;
pub mod auth;
pub mod platform;
pub mod registry;

pub use accounts::AccountRegistry;
pub use auth::{Capability, CapabilitySet};
pub use platform::Platform;
pub use registry::RequestRegistry;
