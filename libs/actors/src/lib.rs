//! Pulse Node Runtime
//!
//! Thread-per-node actor runtime. Nodes are addressed by small integers, own
//! a FIFO mailbox, and talk only through owned messages. A watchdog node
//! supervises liveness with a heartbeat protocol and a single adaptively
//! re-armed timer, and shuts the whole system down when a node goes silent.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────────┐  ping   ┌──────────────────────────┐
//!  │ HeartbeatDriver  │────────►│ worker node (thread)     │
//!  │ (tokio interval) │  query  │  Mailbox → run_dispatch  │
//!  └──────────────────┘────────►│  kill / ping / Handler   │
//!                               └────────────┬─────────────┘
//!                                            │ pong
//!                               ┌────────────▼─────────────┐
//!                               │ Watchdog node (thread)   │
//!                               │  LivenessTable           │
//!                               │  OneShotTimer ──► wakeup │
//!                               └────────────┬─────────────┘
//!                                            │ kill (on staleness)
//!                                            ▼
//!                                     every monitored node
//! ```
//!
//! # Guarantees
//!
//! - **FIFO per mailbox**: arrival order as serialized by the mailbox lock
//! - **At-most-once delivery**: a message lives in exactly one mailbox and is
//!   dropped by exactly one receiver
//! - **Cooperative shutdown**: nodes stop only on `kill` or handler failure
//!
//! # Examples
//!
//! ```rust
//! use pulse_actors::{Address, Message, Node, NodeContext, Registry, Sender};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(Registry::with_capacity(4));
//! let echo = Node::spawn_handler(
//!     &registry,
//!     Address::new(1),
//!     "echo",
//!     Address::new(0),
//!     |ctx: &NodeContext, msg: &Message| -> pulse_actors::Result<()> {
//!         println!("node {} got {}", ctx.address(), msg.kind());
//!         Ok(())
//!     },
//! )?;
//!
//! registry.send(Address::new(1), Message::query(Sender::External))?;
//! registry.kill(Address::new(1))?;
//! echo.join()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod dispatch;
pub mod error;
pub mod heartbeat;
pub mod mailbox;
pub mod message;
pub mod node;
pub mod registry;
pub mod time;
pub mod timer;
pub mod watchdog;

pub use dispatch::{run_dispatch, Handler, NodeContext};
pub use error::{ActorError, ErrorKind, Result, SendError};
pub use heartbeat::{HeartbeatConfig, HeartbeatDriver, HeartbeatStats};
pub use mailbox::{Mailbox, MailboxStats};
pub use message::{Address, Body, Message, MessageKind, Sender};
pub use node::Node;
pub use registry::Registry;
pub use timer::OneShotTimer;
pub use watchdog::{spawn_watchdog, LivenessTable, Verdict, Watchdog, WatchdogConfig};
