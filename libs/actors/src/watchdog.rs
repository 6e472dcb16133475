//! Watchdog Supervisor
//!
//! Tracks when every monitored node was last heard from and keeps a single
//! one-shot timer armed for the moment the least-recently-seen node would
//! expire. There is no polling interval: the watchdog only wakes when a
//! message arrives or when its own timer enqueues a wake-up.
//!
//! ## Algorithm (per received message)
//!
//! ```text
//! now = monotonic ms
//! if sender is monitored:        last_seen[sender] = now
//! if any now - last_seen > W:    log, kill every monitored node, exit(Timeout)
//! else:                          arm timer at min(last_seen) + W + 1ms
//! ```
//!
//! Timer wake-ups carry [`Sender::Timer`], which is outside the address space
//! and can never refresh a monitored node's timestamp.
//!
//! The liveness table is only ever touched by the watchdog thread after its
//! own blocking receive returns; timer callbacks just enqueue.

use crate::error::{ActorError, Result};
use crate::mailbox::Mailbox;
use crate::message::{Address, Message, MessageKind, Sender};
use crate::node::Node;
use crate::registry::Registry;
use crate::time::{instant_at, monotonic_ms};
use crate::timer::OneShotTimer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Silence tolerated before a node is declared stale
pub const DEFAULT_EXPIRATION_WINDOW: Duration = Duration::from_millis(2000);

/// Watchdog node settings
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// The watchdog's own address
    pub address: Address,
    /// Nodes whose liveness is tracked (and killed on failure)
    pub monitored: Vec<Address>,
    pub expiration_window: Duration,
    /// Node that receives the staleness diagnostic, if any
    pub logger: Option<Address>,
    /// Start every node's clock at watchdog start, so a node that never
    /// answers still expires after one window
    pub seed_at_start: bool,
}

impl WatchdogConfig {
    pub fn new(address: Address, monitored: Vec<Address>) -> Self {
        Self {
            address,
            monitored,
            expiration_window: DEFAULT_EXPIRATION_WINDOW,
            logger: None,
            seed_at_start: true,
        }
    }

    pub fn with_expiration_window(mut self, window: Duration) -> Self {
        self.expiration_window = window;
        self
    }

    pub fn with_logger(mut self, logger: Address) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_seed_at_start(mut self, seed: bool) -> Self {
        self.seed_at_start = seed;
        self
    }
}

/// Last-seen timestamp (ms) per monitored address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessTable {
    entries: Vec<(Address, Option<u64>)>,
}

impl LivenessTable {
    /// Table with nothing seen yet; unseen nodes are never eligible for expiry
    pub fn new(monitored: &[Address]) -> Self {
        Self {
            entries: monitored.iter().map(|&address| (address, None)).collect(),
        }
    }

    /// Table with every node marked as seen at `now_ms`
    pub fn seeded(monitored: &[Address], now_ms: u64) -> Self {
        Self {
            entries: monitored.iter().map(|&address| (address, Some(now_ms))).collect(),
        }
    }

    /// Record that `address` was heard from. Returns false if not monitored.
    pub fn observe(&mut self, address: Address, now_ms: u64) -> bool {
        match self.entries.iter_mut().find(|(a, _)| *a == address) {
            Some((_, last_seen)) => {
                *last_seen = Some(now_ms);
                true
            }
            None => false,
        }
    }

    pub fn last_seen(&self, address: Address) -> Option<u64> {
        self.entries
            .iter()
            .find(|(a, _)| *a == address)
            .and_then(|(_, last_seen)| *last_seen)
    }

    /// Oldest timestamp among nodes seen at least once
    pub fn earliest(&self) -> Option<u64> {
        self.entries.iter().filter_map(|(_, last_seen)| *last_seen).min()
    }

    /// Absolute time (ms) at which the oldest entry first exceeds `window_ms`
    pub fn next_deadline(&self, window_ms: u64) -> Option<u64> {
        self.earliest().map(|earliest| earliest + window_ms + 1)
    }

    /// The stalest node silent for longer than `window_ms`, if any.
    /// Ties go to the lowest address.
    pub fn stalest_expired(&self, now_ms: u64, window_ms: u64) -> Option<(Address, u64)> {
        self.entries
            .iter()
            .filter_map(|&(address, last_seen)| last_seen.map(|t| (address, t)))
            .filter(|&(_, last_seen)| now_ms.saturating_sub(last_seen) > window_ms)
            .min_by_key(|&(address, last_seen)| (last_seen, address))
    }

    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.entries.iter().map(|(address, _)| *address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of processing one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Everyone fresh; wake again at this absolute time (ms), if anything is tracked
    Healthy { next_deadline_ms: Option<u64> },
    /// A node exceeded the window
    Stale { address: Address, last_seen_ms: u64 },
}

/// Supervisor node state
pub struct Watchdog {
    config: WatchdogConfig,
    registry: Arc<Registry>,
    table: LivenessTable,
    timer: OneShotTimer,
}

impl Watchdog {
    /// Build the watchdog around its own mailbox; the timer wakes it by
    /// enqueuing a `pong` from [`Sender::Timer`].
    pub fn new(config: WatchdogConfig, registry: Arc<Registry>, mailbox: &Mailbox) -> Result<Self> {
        let wakeups = mailbox.clone();
        let timer = OneShotTimer::spawn(format!("watchdog-{}-timer", config.address), move || {
            wakeups.put(Message::pong(Sender::Timer));
        })?;

        let table = if config.seed_at_start {
            LivenessTable::seeded(&config.monitored, monotonic_ms())
        } else {
            LivenessTable::new(&config.monitored)
        };

        Ok(Self {
            config,
            registry,
            table,
            timer,
        })
    }

    pub fn table(&self) -> &LivenessTable {
        &self.table
    }

    fn window_ms(&self) -> u64 {
        self.config.expiration_window.as_millis() as u64
    }

    /// Update the table for a message from `sender` received at `now_ms`
    pub fn evaluate(&mut self, sender: Sender, now_ms: u64) -> Verdict {
        if let Some(address) = sender.address() {
            if !self.table.observe(address, now_ms) {
                trace!(address = %address, "Message from unmonitored node");
            }
        }

        let window_ms = self.window_ms();
        match self.table.stalest_expired(now_ms, window_ms) {
            Some((address, last_seen_ms)) => Verdict::Stale {
                address,
                last_seen_ms,
            },
            None => Verdict::Healthy {
                next_deadline_ms: self.table.next_deadline(window_ms),
            },
        }
    }

    /// Receive until `kill` (Ok) or a stale node (Timeout)
    pub fn run(mut self, mailbox: &Mailbox) -> Result<()> {
        info!(
            address = %self.config.address,
            monitored = self.table.len(),
            window_ms = self.window_ms(),
            "Watchdog started"
        );
        self.rearm(self.table.next_deadline(self.window_ms()));

        loop {
            let message = mailbox.get();
            if message.kind() == MessageKind::Kill {
                self.timer.disarm();
                info!(address = %self.config.address, from = %message.sender(), "Watchdog stopped");
                return Ok(());
            }

            let now_ms = monotonic_ms();
            match self.evaluate(message.sender(), now_ms) {
                Verdict::Healthy { next_deadline_ms } => self.rearm(next_deadline_ms),
                Verdict::Stale {
                    address,
                    last_seen_ms,
                } => {
                    self.shutdown_all(address, last_seen_ms, now_ms);
                    return Err(ActorError::Timeout {
                        address,
                        last_seen_ms,
                    });
                }
            }
        }
    }

    fn rearm(&self, deadline_ms: Option<u64>) {
        match deadline_ms {
            Some(deadline_ms) => {
                trace!(deadline_ms, "Rearming watchdog timer");
                self.timer.arm_at(instant_at(deadline_ms));
            }
            None => self.timer.disarm(),
        }
    }

    /// Log the failure and kill every monitored node exactly once
    fn shutdown_all(&self, stale: Address, last_seen_ms: u64, now_ms: u64) {
        self.timer.disarm();

        let text = format!("node {} is stale, since {}ms", stale, last_seen_ms);
        error!(
            address = %stale,
            last_seen_ms,
            silent_ms = now_ms - last_seen_ms,
            "Node is stale, shutting down all monitored nodes"
        );
        if let Some(logger) = self.config.logger {
            if let Err(err) = self.registry.send(logger, Message::log(self.config.address, text)) {
                warn!(logger = %logger, error = %err, "Could not deliver staleness log");
            }
        }

        for address in self.table.addresses() {
            match self.registry.kill_from(self.config.address, address) {
                Ok(()) => debug!(address = %address, "Kill sent"),
                Err(err) => warn!(address = %address, error = %err, "Kill not delivered"),
            }
        }
    }
}

/// Register the watchdog at `config.address` and start it on its own thread
pub fn spawn_watchdog(registry: &Arc<Registry>, config: WatchdogConfig) -> Result<Node> {
    let shared = Arc::clone(registry);
    let address = config.address;
    Node::spawn(registry, address, format!("watchdog-{}", address), move |mailbox| {
        Watchdog::new(config, shared, &mailbox)?.run(&mailbox)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs(raw: &[u16]) -> Vec<Address> {
        raw.iter().map(|&a| Address::new(a)).collect()
    }

    #[test]
    fn test_deadline_tracks_least_recently_seen() {
        let t0 = 10_000;
        let mut table = LivenessTable::new(&addrs(&[5, 6, 7]));
        table.observe(Address::new(5), t0);
        table.observe(Address::new(6), t0 + 500);
        table.observe(Address::new(7), t0 + 900);

        assert_eq!(table.earliest(), Some(t0));
        assert_eq!(table.next_deadline(2000), Some(t0 + 2001));

        // not earlier than the window
        assert_eq!(table.stalest_expired(t0 + 1999, 2000), None);
        assert_eq!(table.stalest_expired(t0 + 2000, 2000), None);
        // immediately after
        assert_eq!(
            table.stalest_expired(t0 + 2001, 2000),
            Some((Address::new(5), t0))
        );
        // once several expire, the stalest is reported
        assert_eq!(
            table.stalest_expired(t0 + 5000, 2000),
            Some((Address::new(5), t0))
        );
    }

    #[test]
    fn test_unseen_nodes_never_expire() {
        let mut table = LivenessTable::new(&addrs(&[1, 2]));
        assert_eq!(table.earliest(), None);
        assert_eq!(table.next_deadline(2000), None);
        assert_eq!(table.stalest_expired(1_000_000, 2000), None);

        table.observe(Address::new(2), 100);
        assert_eq!(table.stalest_expired(1_000_000, 2000), Some((Address::new(2), 100)));
        assert_eq!(table.last_seen(Address::new(1)), None);
    }

    #[test]
    fn test_ties_go_to_lowest_address() {
        let table = LivenessTable::seeded(&addrs(&[4, 2, 3]), 0);
        assert_eq!(table.stalest_expired(3000, 2000), Some((Address::new(2), 0)));
    }

    #[test]
    fn test_observe_ignores_unmonitored() {
        let mut table = LivenessTable::seeded(&addrs(&[1]), 0);
        assert!(!table.observe(Address::new(9), 50));
        assert!(table.observe(Address::new(1), 50));
        assert_eq!(table.last_seen(Address::new(1)), Some(50));
    }

    #[test]
    fn test_timer_wakeups_never_refresh() {
        let registry = Arc::new(Registry::default());
        let mailbox = registry.register(Address::new(0)).unwrap();
        let config = WatchdogConfig::new(Address::new(0), addrs(&[1, 2]))
            .with_seed_at_start(false);
        let mut watchdog = Watchdog::new(config, registry, &mailbox).unwrap();

        watchdog.evaluate(Sender::Node(Address::new(1)), 100);
        watchdog.evaluate(Sender::Node(Address::new(2)), 150);
        let verdict = watchdog.evaluate(Sender::Timer, 1000);
        assert_eq!(
            verdict,
            Verdict::Healthy {
                next_deadline_ms: Some(2101)
            }
        );
        assert_eq!(watchdog.table().last_seen(Address::new(1)), Some(100));
        assert_eq!(watchdog.table().last_seen(Address::new(2)), Some(150));

        // a wake-up after expiry reports the stale node instead of masking it
        let verdict = watchdog.evaluate(Sender::Timer, 2101);
        assert_eq!(
            verdict,
            Verdict::Stale {
                address: Address::new(1),
                last_seen_ms: 100
            }
        );
    }

    #[test]
    fn test_external_sender_does_not_refresh() {
        let registry = Arc::new(Registry::default());
        let mailbox = registry.register(Address::new(0)).unwrap();
        let config = WatchdogConfig::new(Address::new(0), addrs(&[1])).with_seed_at_start(false);
        let mut watchdog = Watchdog::new(config, registry, &mailbox).unwrap();

        watchdog.evaluate(Sender::External, 10);
        assert_eq!(watchdog.table().earliest(), None);
    }
}
