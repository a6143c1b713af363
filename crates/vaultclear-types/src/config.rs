//! Configuration for the settlement engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Result, VaultclearError, constants};

/// Settlement engine configuration.
///
/// The cooldown is the review window between `propose` and the earliest
/// `execute`; the yield tolerance is the primary defense against operator
/// or reporting error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Review window between proposal and earliest execution.
    /// Bounded to `[0, MAX_COOLDOWN_SECS]`.
    pub cooldown: Duration,
    /// Ceiling on `|yield| / last_settled_total`, in basis points.
    /// `None` disables the check.
    pub yield_tolerance_bps: Option<u32>,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(constants::DEFAULT_COOLDOWN_SECS),
            yield_tolerance_bps: Some(constants::DEFAULT_YIELD_TOLERANCE_BPS),
        }
    }
}

impl SettlementConfig {
    /// Update the cooldown. Rejects values above the 24h ceiling.
    ///
    /// # Errors
    /// Returns [`VaultclearError::Configuration`] if `cooldown` exceeds
    /// [`constants::MAX_COOLDOWN_SECS`].
    pub fn set_cooldown(&mut self, cooldown: Duration) -> Result<()> {
        if cooldown.as_secs() > constants::MAX_COOLDOWN_SECS {
            return Err(VaultclearError::Configuration(format!(
                "cooldown {}s exceeds maximum {}s",
                cooldown.as_secs(),
                constants::MAX_COOLDOWN_SECS
            )));
        }
        self.cooldown = cooldown;
        Ok(())
    }

    /// Update the yield tolerance. Rejects values above 100% (10,000 bps).
    ///
    /// # Errors
    /// Returns [`VaultclearError::Configuration`] if `bps` exceeds
    /// [`constants::BPS_DENOMINATOR`].
    pub fn set_yield_tolerance(&mut self, bps: Option<u32>) -> Result<()> {
        if let Some(bps) = bps {
            if u64::from(bps) > constants::BPS_DENOMINATOR {
                return Err(VaultclearError::Configuration(format!(
                    "yield tolerance {bps}bps exceeds maximum {}bps",
                    constants::BPS_DENOMINATOR
                )));
            }
        }
        self.yield_tolerance_bps = bps;
        Ok(())
    }
}
