//! # Pulse Configuration
//!
//! Defaults and layered configuration loading for the load monitor.
//!
//! ## Features
//!
//! - **Defaults**: node addresses, expiration window, heartbeat period
//! - **Layering**: built-in defaults, then an optional TOML file, then
//!   `PULSE_*` environment variables
//! - **Validation**: address collisions and zero durations are rejected
//!   before any node starts
//!
//! ## Usage
//!
//! ```rust
//! use pulse_config::{defaults, MonitorConfig};
//!
//! let config = MonitorConfig::default();
//! assert_eq!(config.nodes.watchdog, defaults::addresses::WATCHDOG);
//! assert!(config.validate().is_ok());
//! ```

pub mod defaults;
pub mod monitor_config;

pub use monitor_config::{
    load_config, LoggingConfig, MonitorConfig, NodeAddresses, ReaderConfig, RuntimeConfig,
};
