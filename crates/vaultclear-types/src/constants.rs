//! System-wide constants for the VaultClear settlement core.

/// Default settlement cooldown (review window) in seconds: 1 hour.
pub const DEFAULT_COOLDOWN_SECS: u64 = 3_600;

/// Maximum settlement cooldown in seconds: 24 hours.
pub const MAX_COOLDOWN_SECS: u64 = 86_400;

/// Default yield tolerance ceiling in basis points (10%).
pub const DEFAULT_YIELD_TOLERANCE_BPS: u32 = 1_000;

/// Basis point denominator (100% = 10,000 bps).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Maximum decimal precision for asset amounts (8 decimal places).
pub const AMOUNT_PRECISION: u32 = 8;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "VaultClear";
