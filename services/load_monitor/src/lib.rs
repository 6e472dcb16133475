//! # Pulse Load Monitor
//!
//! Samples `/proc/stat` once per heartbeat and prints the busy percentage of
//! every core, using one node per stage:
//!
//! - **reader**: reads the raw stat text on each `query`
//! - **parser**: turns two successive samples into per-core load
//! - **printer**: writes `core N: x%` lines
//! - **logger**: writes timestamped `log` messages
//! - **watchdog**: shuts everything down when a stage stops answering pings

pub mod handlers;
pub mod monitor;
pub mod stats;

pub use monitor::{Monitor, NodeExit, Outputs};
pub use stats::{average_load, parse_samples, CpuSample, StatsError};
