//! Monitor Configuration Module
//!
//! Loads the load monitor's settings from built-in defaults, an optional TOML
//! file and `PULSE_*` environment overrides, in that order.

use crate::defaults;
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Main monitor configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct MonitorConfig {
    /// Registry and supervision timing
    pub runtime: RuntimeConfig,

    /// Address assignment for every node role
    pub nodes: NodeAddresses,

    /// Sample source
    pub reader: ReaderConfig,

    pub logging: LoggingConfig,
}

/// Registry and supervision timing
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub capacity: usize,
    pub expiration_window_ms: u64,
    pub heartbeat_period_ms: u64,
    /// Start every node's liveness clock when the watchdog starts
    pub seed_at_start: bool,
}

/// Address per node role
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct NodeAddresses {
    pub watchdog: u16,
    pub logger: u16,
    pub reader: u16,
    pub parser: u16,
    pub printer: u16,
    /// Node that receives `kill` on SIGINT/SIGTERM
    pub entry: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ReaderConfig {
    pub stat_path: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when neither `--log-level` nor `RUST_LOG` is set
    pub level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::runtime::CAPACITY,
            expiration_window_ms: defaults::runtime::EXPIRATION_WINDOW_MS,
            heartbeat_period_ms: defaults::runtime::HEARTBEAT_PERIOD_MS,
            seed_at_start: true,
        }
    }
}

impl Default for NodeAddresses {
    fn default() -> Self {
        Self {
            watchdog: defaults::addresses::WATCHDOG,
            logger: defaults::addresses::LOGGER,
            reader: defaults::addresses::READER,
            parser: defaults::addresses::PARSER,
            printer: defaults::addresses::PRINTER,
            entry: defaults::addresses::ENTRY,
        }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            stat_path: PathBuf::from(defaults::reader::STAT_PATH),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::logging::LEVEL.to_string(),
        }
    }
}

impl NodeAddresses {
    /// Every role with its address, watchdog first
    pub fn roles(&self) -> [(&'static str, u16); 5] {
        [
            ("watchdog", self.watchdog),
            ("logger", self.logger),
            ("reader", self.reader),
            ("parser", self.parser),
            ("printer", self.printer),
        ]
    }

    /// Nodes supervised by the watchdog
    pub fn workers(&self) -> [u16; 4] {
        [self.logger, self.reader, self.parser, self.printer]
    }
}

impl MonitorConfig {
    /// Load configuration, layering an optional file and environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading monitor config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        // Override with environment variables (PULSE_ prefix)
        builder = builder.add_source(
            Environment::with_prefix(defaults::ENV_PREFIX)
                .prefix_separator("_")
                .separator(defaults::ENV_SEPARATOR)
                .try_parsing(true),
        );

        let config: MonitorConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        debug!(?config, "Monitor configuration loaded");
        Ok(config)
    }

    /// Parse a TOML document on its own, without environment overrides
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse TOML configuration")
    }

    /// Reject settings no runtime could start with
    pub fn validate(&self) -> Result<()> {
        let runtime = &self.runtime;
        if runtime.capacity == 0 {
            bail!("runtime.capacity must be positive");
        }
        if runtime.expiration_window_ms == 0 {
            bail!("runtime.expiration_window_ms must be positive");
        }
        if runtime.heartbeat_period_ms == 0 {
            bail!("runtime.heartbeat_period_ms must be positive");
        }

        let roles = self.nodes.roles();
        for (i, (role, address)) in roles.iter().enumerate() {
            if usize::from(*address) >= runtime.capacity {
                bail!(
                    "nodes.{} = {} is outside the registry (capacity {})",
                    role,
                    address,
                    runtime.capacity
                );
            }
            if let Some((other, _)) = roles[..i].iter().find(|(_, a)| a == address) {
                bail!("nodes.{} and nodes.{} share address {}", other, role, address);
            }
        }

        if !roles.iter().any(|(_, address)| *address == self.nodes.entry) {
            bail!("nodes.entry = {} is not a node address", self.nodes.entry);
        }

        if self.reader.stat_path.as_os_str().is_empty() {
            bail!("reader.stat_path must not be empty");
        }
        Ok(())
    }

    pub fn expiration_window(&self) -> Duration {
        Duration::from_millis(self.runtime.expiration_window_ms)
    }

    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_millis(self.runtime.heartbeat_period_ms)
    }
}

/// Convenience function to load and validate configuration
pub fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    let config = MonitorConfig::load(path)?;
    config.validate()?;
    Ok(config)
}
