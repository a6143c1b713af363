//! Account registry and the gateway → vault pairing relation.
//!
//! The pairing is an explicit, queryable relation registered per
//! `(gateway, asset)`, not a naming convention: settlement routing looks
//! it up through the [`AccountDirectory`] trait.

use std::collections::HashMap;

use tracing::info;
use vaultclear_settlement::AccountDirectory;
use vaultclear_types::{
    AccountId, AccountInfo, AccountRole, Asset, Result, VaultclearError,
};

/// All registered accounts and their pairings.
pub struct AccountRegistry {
    accounts: HashMap<AccountId, AccountInfo>,
    /// `(gateway, asset)` → the vault its net inflow is routed to.
    pairings: HashMap<(AccountId, Asset), AccountId>,
}

impl AccountRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
            pairings: HashMap::new(),
        }
    }

    /// Register a new account and return its id.
    pub fn register(&mut self, role: AccountRole, name: impl Into<String>) -> AccountId {
        let id = AccountId::new();
        let info = AccountInfo::new(id, role, name);
        info!(account = %id, %role, name = %info.name, "registered account");
        self.accounts.insert(id, info);
        id
    }

    /// Look up account metadata.
    #[must_use]
    pub fn get(&self, account: AccountId) -> Option<&AccountInfo> {
        self.accounts.get(&account)
    }

    /// The role of a registered account.
    ///
    /// # Errors
    /// Returns `AccountNotFound` for unregistered accounts.
    pub fn role(&self, account: AccountId) -> Result<AccountRole> {
        self.accounts
            .get(&account)
            .map(|info| info.role)
            .ok_or(VaultclearError::AccountNotFound(account))
    }

    /// Pair a gateway's net inflow for `asset` with a vault.
    ///
    /// Re-pairing overwrites the previous vault for the `(gateway, asset)`
    /// key; settlements already executed are unaffected.
    ///
    /// # Errors
    /// - `AccountNotFound` if either account is unregistered
    /// - `Configuration` if the roles do not match the relation
    pub fn pair_vault(
        &mut self,
        gateway: AccountId,
        asset: &str,
        vault: AccountId,
    ) -> Result<()> {
        if self.role(gateway)? != AccountRole::Gateway {
            return Err(VaultclearError::Configuration(format!(
                "account {gateway} is not a gateway"
            )));
        }
        if self.role(vault)? != AccountRole::Vault {
            return Err(VaultclearError::Configuration(format!(
                "account {vault} is not a vault"
            )));
        }
        self.pairings.insert((gateway, asset.to_string()), vault);
        info!(%gateway, asset, %vault, "paired vault");
        Ok(())
    }

    /// Number of registered accounts.
    #[must_use]
    pub fn count(&self) -> usize {
        self.accounts.len()
    }
}

impl Default for AccountRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountDirectory for AccountRegistry {
    fn role(&self, account: AccountId) -> Result<AccountRole> {
        AccountRegistry::role(self, account)
    }

    fn paired_vault(&self, gateway: AccountId, asset: &str) -> Option<AccountId> {
        self.pairings.get(&(gateway, asset.to_string())).copied()
    }
}
