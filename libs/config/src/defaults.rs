//! Default configuration values
//!
//! Mirrors the reference deployment: five nodes in a five-slot registry,
//! a one second heartbeat and a two second expiration window.

/// Prefix for environment overrides (`PULSE_RUNTIME__CAPACITY=8`)
pub const ENV_PREFIX: &str = "PULSE";

/// Separator between nested keys in environment overrides
pub const ENV_SEPARATOR: &str = "__";

/// Runtime defaults
pub mod runtime {
    /// Registry slots (addresses `0..CAPACITY`)
    pub const CAPACITY: usize = 5;

    /// Silence tolerated before a node is declared stale (milliseconds)
    pub const EXPIRATION_WINDOW_MS: u64 = 2_000;

    /// Heartbeat / query period (milliseconds)
    pub const HEARTBEAT_PERIOD_MS: u64 = 1_000;
}

/// Reference node addresses
pub mod addresses {
    pub const WATCHDOG: u16 = 0;
    pub const LOGGER: u16 = 1;
    pub const READER: u16 = 2;
    pub const PARSER: u16 = 3;
    pub const PRINTER: u16 = 4;

    /// Node that receives `kill` on SIGINT/SIGTERM
    pub const ENTRY: u16 = LOGGER;
}

/// Reader defaults
pub mod reader {
    /// Kernel CPU statistics
    pub const STAT_PATH: &str = "/proc/stat";
}

/// Logging defaults
pub mod logging {
    pub const LEVEL: &str = "info";
}
