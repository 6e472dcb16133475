//! Load Monitor Assembly
//!
//! Starts the watchdog and the four worker nodes in one registry, exposes the
//! heartbeat configuration that drives them, and collects exit statuses.

use crate::handlers::{LoggerHandler, Output, ParserHandler, PrinterHandler, ReaderHandler};
use anyhow::{Context, Result};
use pulse_actors::{
    spawn_watchdog, ActorError, Address, HeartbeatConfig, Message, Node, Registry,
    WatchdogConfig,
};
use pulse_config::MonitorConfig;
use std::sync::Arc;
use tracing::{info, warn};

/// Where the logger and printer write
pub struct Outputs {
    pub log: Output,
    pub print: Output,
}

impl Outputs {
    pub fn stdout() -> Self {
        Self {
            log: Box::new(std::io::stdout()),
            print: Box::new(std::io::stdout()),
        }
    }
}

/// Exit status of one node
#[derive(Debug)]
pub struct NodeExit {
    pub name: String,
    pub address: Address,
    pub status: pulse_actors::Result<()>,
}

impl NodeExit {
    /// Stopped by `kill` or by the watchdog's cascading shutdown
    pub fn is_clean(&self) -> bool {
        matches!(self.status, Ok(()) | Err(ActorError::Timeout { .. }))
    }
}

/// Running load monitor
pub struct Monitor {
    registry: Arc<Registry>,
    nodes: Vec<Node>,
    entry: Address,
    heartbeat: HeartbeatConfig,
}

impl Monitor {
    /// Register and start every node
    pub fn start(config: &MonitorConfig, outputs: Outputs) -> Result<Self> {
        let registry = Arc::new(Registry::with_capacity(config.runtime.capacity));
        let nodes_config = &config.nodes;
        let watchdog = Address::new(nodes_config.watchdog);
        let logger = Address::new(nodes_config.logger);
        let reader = Address::new(nodes_config.reader);
        let parser = Address::new(nodes_config.parser);
        let printer = Address::new(nodes_config.printer);
        let workers: Vec<Address> = nodes_config.workers().into_iter().map(Address::new).collect();

        let mut nodes = Vec::with_capacity(5);
        nodes.push(
            Node::spawn_handler(&registry, logger, "logger", watchdog, LoggerHandler::new(outputs.log))
                .context("Failed to start logger")?,
        );

        let watchdog_config = WatchdogConfig::new(watchdog, workers.clone())
            .with_expiration_window(config.expiration_window())
            .with_logger(logger)
            .with_seed_at_start(config.runtime.seed_at_start);
        nodes.push(spawn_watchdog(&registry, watchdog_config).context("Failed to start watchdog")?);

        nodes.push(
            Node::spawn_handler(
                &registry,
                reader,
                "reader",
                watchdog,
                ReaderHandler::new(&config.reader.stat_path, parser),
            )
            .context("Failed to start reader")?,
        );
        nodes.push(
            Node::spawn_handler(&registry, parser, "parser", watchdog, ParserHandler::new(printer))
                .context("Failed to start parser")?,
        );
        nodes.push(
            Node::spawn_handler(
                &registry,
                printer,
                "printer",
                watchdog,
                PrinterHandler::new(outputs.print),
            )
            .context("Failed to start printer")?,
        );

        info!(nodes = nodes.len(), capacity = registry.capacity(), "All nodes started");
        if let Err(err) = registry.send(logger, Message::log(watchdog, "booted up")) {
            warn!(error = %err, "Boot log not delivered");
        }

        let heartbeat = HeartbeatConfig::new(workers)
            .with_period(config.heartbeat_period())
            .with_query_target(reader);

        Ok(Self {
            registry,
            nodes,
            entry: Address::new(nodes_config.entry),
            heartbeat,
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Node that receives `kill` on shutdown request
    pub fn entry(&self) -> Address {
        self.entry
    }

    pub fn heartbeat_config(&self) -> &HeartbeatConfig {
        &self.heartbeat
    }

    /// Send `kill` to the entry node. The watchdog notices it went silent
    /// and stops everything else.
    pub fn request_shutdown(&self) -> Result<()> {
        self.registry
            .kill(self.entry)
            .with_context(|| format!("Failed to deliver kill to entry node {}", self.entry))
    }

    /// Block until every node has stopped
    pub fn join(self) -> Vec<NodeExit> {
        self.nodes
            .into_iter()
            .map(|node| {
                let name = node.name().to_string();
                let address = node.address();
                let status = node.join();
                NodeExit {
                    name,
                    address,
                    status,
                }
            })
            .collect()
    }
}
