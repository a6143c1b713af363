//! Account model for the two kinds of ledger participants.
//!
//! The institutional **gateway** takes client deposits and serves
//! redemptions; **yield vaults** custody deployed capital and accrue
//! yield. Settlement branches on this role.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::AccountId;

/// The role an account plays in settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountRole {
    /// Institutional gateway: pass-through deposits, serves redemptions.
    Gateway,
    /// Yield vault: custodies deployed capital; settlement applies yield
    /// to claim supply.
    Vault,
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gateway => write!(f, "GATEWAY"),
            Self::Vault => write!(f, "VAULT"),
        }
    }
}

/// Registered account metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    /// The account's stable identifier.
    pub id: AccountId,
    /// Gateway or vault.
    pub role: AccountRole,
    /// Human-readable label for operator tooling and logs.
    pub name: String,
}

impl AccountInfo {
    #[must_use]
    pub fn new(id: AccountId, role: AccountRole, name: impl Into<String>) -> Self {
        Self {
            id,
            role,
            name: name.into(),
        }
    }
}
