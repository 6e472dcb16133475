//! Periodic Heartbeat / Query Driver
//!
//! Fires at a fixed period on the tokio runtime. Every tick pings each
//! worker (which answers the watchdog with a pong) and sends one `query` to
//! the node that starts the application's work cycle.
//!
//! Sends only enqueue, so a slow work cycle never delays the next tick and
//! successive ticks may overlap with work still in flight.

use crate::message::{Address, Message, Sender};
use crate::registry::Registry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default tick period (1 Hz)
pub const DEFAULT_HEARTBEAT_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    pub period: Duration,
    /// Nodes pinged on every tick
    pub targets: Vec<Address>,
    /// Node receiving one `query` per tick
    pub query_target: Option<Address>,
}

impl HeartbeatConfig {
    pub fn new(targets: Vec<Address>) -> Self {
        Self {
            period: DEFAULT_HEARTBEAT_PERIOD,
            targets,
            query_target: None,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_query_target(mut self, target: Address) -> Self {
        self.query_target = Some(target);
        self
    }
}

/// Driver counters
#[derive(Debug, Default)]
pub struct HeartbeatStats {
    pub ticks: AtomicU64,
    pub pings_sent: AtomicU64,
    pub queries_sent: AtomicU64,
    pub failed_sends: AtomicU64,
}

/// Handle to the running driver task
#[derive(Debug)]
pub struct HeartbeatDriver {
    task: JoinHandle<()>,
    stop: Arc<Notify>,
    stats: Arc<HeartbeatStats>,
}

impl HeartbeatDriver {
    /// Start ticking. Must be called from within a tokio runtime.
    pub fn spawn(registry: Arc<Registry>, config: HeartbeatConfig) -> Self {
        let stop = Arc::new(Notify::new());
        let stats = Arc::new(HeartbeatStats::default());

        let task = tokio::spawn({
            let stop = Arc::clone(&stop);
            let stats = Arc::clone(&stats);
            async move {
                let mut interval = time::interval(config.period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                info!(
                    period_ms = config.period.as_millis() as u64,
                    targets = config.targets.len(),
                    "Heartbeat driver started"
                );

                loop {
                    tokio::select! {
                        _ = interval.tick() => tick(&registry, &config, &stats),
                        _ = stop.notified() => break,
                    }
                }
                debug!(ticks = stats.ticks.load(Ordering::Relaxed), "Heartbeat driver stopped");
            }
        });

        Self { task, stop, stats }
    }

    pub fn stats(&self) -> &HeartbeatStats {
        &self.stats
    }

    pub fn ticks(&self) -> u64 {
        self.stats.ticks.load(Ordering::Relaxed)
    }

    /// Stop ticking and wait for the task to finish
    pub async fn shutdown(self) {
        self.stop.notify_one();
        if let Err(err) = self.task.await {
            warn!(error = %err, "Heartbeat driver task ended abnormally");
        }
    }
}

fn tick(registry: &Registry, config: &HeartbeatConfig, stats: &HeartbeatStats) {
    stats.ticks.fetch_add(1, Ordering::Relaxed);

    for &target in &config.targets {
        match registry.send(target, Message::ping(Sender::External)) {
            Ok(()) => {
                stats.pings_sent.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                stats.failed_sends.fetch_add(1, Ordering::Relaxed);
                warn!(target = %target, error = %err, "Ping not delivered");
            }
        }
    }

    if let Some(target) = config.query_target {
        match registry.send(target, Message::query(Sender::External)) {
            Ok(()) => {
                stats.queries_sent.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                stats.failed_sends.fetch_add(1, Ordering::Relaxed);
                warn!(target = %target, error = %err, "Query not delivered");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    #[tokio::test]
    async fn test_tick_pings_every_target_and_queries_once() {
        let registry = Arc::new(Registry::default());
        let one = registry.register(Address::new(1)).unwrap();
        let two = registry.register(Address::new(2)).unwrap();

        let config = HeartbeatConfig::new(vec![Address::new(1), Address::new(2)])
            .with_period(Duration::from_millis(20))
            .with_query_target(Address::new(2));
        let driver = HeartbeatDriver::spawn(Arc::clone(&registry), config);

        // first tick is immediate
        time::sleep(Duration::from_millis(10)).await;
        driver.shutdown().await;

        assert_eq!(one.len(), 1);
        assert_eq!(one.get().kind(), MessageKind::Ping);

        assert_eq!(two.len(), 2);
        let ping = two.get();
        assert_eq!(ping.kind(), MessageKind::Ping);
        assert_eq!(ping.sender(), Sender::External);
        assert_eq!(two.get().kind(), MessageKind::Query);
    }

    #[tokio::test]
    async fn test_unregistered_target_counts_failure() {
        let registry = Arc::new(Registry::default());
        let one = registry.register(Address::new(1)).unwrap();

        let config = HeartbeatConfig::new(vec![Address::new(1), Address::new(3)])
            .with_period(Duration::from_millis(50));
        let driver = HeartbeatDriver::spawn(registry, config);

        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(driver.ticks(), 1);
        assert_eq!(driver.stats().failed_sends.load(Ordering::Relaxed), 1);
        assert_eq!(driver.stats().pings_sent.load(Ordering::Relaxed), 1);
        driver.shutdown().await;

        assert_eq!(one.len(), 1);
    }

    #[tokio::test]
    async fn test_ticks_repeat() {
        let registry = Arc::new(Registry::default());
        let one = registry.register(Address::new(1)).unwrap();

        let config =
            HeartbeatConfig::new(vec![Address::new(1)]).with_period(Duration::from_millis(20));
        let driver = HeartbeatDriver::spawn(registry, config);

        time::sleep(Duration::from_millis(110)).await;
        driver.shutdown().await;

        assert!(one.len() >= 3);
    }
}
