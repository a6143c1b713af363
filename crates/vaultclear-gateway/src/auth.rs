//! Capability-based authorization.
//!
//! Every privileged Platform operation names one capability and checks it
//! exactly once at the boundary. Settlement execution is deliberately
//! permissionless: once the cooldown has elapsed, anyone may trigger the
//! commit, because everything it commits was fixed and reviewable at
//! propose time.

use std::collections::HashSet;
use std::fmt;

use vaultclear_types::{Result, VaultclearError};

/// A single grantable permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Record deposits, redemption/stake/unstake requests, cancellations.
    RecordEntries,
    /// Move virtual balance between accounts (allocation, peg protection).
    Transfer,
    /// Open and close batches.
    CloseBatch,
    /// Propose settlements.
    Propose,
    /// Cancel pending settlement proposals (the guardian valve).
    CancelProposal,
    /// Registry and configuration changes. Implies every other capability.
    Admin,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecordEntries => write!(f, "RECORD_ENTRIES"),
            Self::Transfer => write!(f, "TRANSFER"),
            Self::CloseBatch => write!(f, "CLOSE_BATCH"),
            Self::Propose => write!(f, "PROPOSE"),
            Self::CancelProposal => write!(f, "CANCEL_PROPOSAL"),
            Self::Admin => write!(f, "ADMIN"),
        }
    }
}

/// The set of capabilities held by a caller.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    caps: HashSet<Capability>,
}

impl CapabilitySet {
    /// An empty set: every privileged operation is denied.
    #[must_use]
    pub fn new() -> Self {
        Self {
            caps: HashSet::new(),
        }
    }

    /// A set holding the given capabilities.
    #[must_use]
    pub fn with(caps: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            caps: caps.into_iter().collect(),
        }
    }

    /// The full-authority set.
    #[must_use]
    pub fn admin() -> Self {
        Self::with([Capability::Admin])
    }

    /// Grant a capability.
    pub fn grant(&mut self, cap: Capability) {
        self.caps.insert(cap);
    }

    /// Revoke a capability.
    pub fn revoke(&mut self, cap: Capability) {
        self.caps.remove(&cap);
    }

    /// Whether the set holds `cap`. Admin implies everything.
    #[must_use]
    pub fn has(&self, cap: Capability) -> bool {
        self.caps.contains(&cap) || self.caps.contains(&Capability::Admin)
    }

    /// Require `cap`, erroring when it is missing.
    ///
    /// # Errors
    /// Returns [`VaultclearError::Unauthorized`] naming the capability.
    pub fn require(&self, cap: Capability) -> Result<()> {
        if self.has(cap) {
            Ok(())
        } else {
            Err(VaultclearError::Unauthorized {
                capability: cap.to_string(),
            })
        }
    }
}
