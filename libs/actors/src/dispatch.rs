//! Generic Dispatch Loop
//!
//! Drives a node's receive/handle cycle so every worker gets the same
//! control-message semantics:
//!
//! - `kill`: stop, reporting success
//! - `ping`: reply `pong` to the watchdog with the node's own address
//! - anything else: forwarded to the node's [`Handler`]
//!
//! ```text
//!            kill
//! Running ─────────► Stopped(Ok)
//!    │
//!    │ handler error
//!    └─────────────► Stopped(Err)
//! ```
//!
//! The loop owns each message; handlers only borrow it and the message is
//! dropped as soon as the handler returns. Nodes never restart themselves.

use crate::error::Result;
use crate::mailbox::Mailbox;
use crate::message::{Address, Message, MessageKind, Sender};
use crate::registry::Registry;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// Everything a handler needs to talk to the rest of the system
#[derive(Debug, Clone)]
pub struct NodeContext {
    address: Address,
    watchdog: Address,
    registry: Arc<Registry>,
}

impl NodeContext {
    pub fn new(address: Address, watchdog: Address, registry: Arc<Registry>) -> Self {
        Self {
            address,
            watchdog,
            registry,
        }
    }

    /// This node's address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Where pongs are reported
    pub fn watchdog(&self) -> Address {
        self.watchdog
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Send a message from this node
    pub fn send(&self, to: Address, message: Message) -> Result<()> {
        self.registry.send(to, message)?;
        Ok(())
    }

    /// Ask another node (or this one) to stop
    pub fn kill(&self, to: Address) -> Result<()> {
        self.registry.kill_from(self.address, to)?;
        Ok(())
    }

    /// Report liveness to the watchdog
    fn report_alive(&self) {
        if let Err(err) = self.registry.send(self.watchdog, Message::pong(self.address)) {
            warn!(
                address = %self.address,
                watchdog = %self.watchdog,
                error = %err,
                "Dropping pong"
            );
        }
    }
}

/// Application logic plugged in behind the dispatch loop
pub trait Handler {
    /// Handle one non-control message. Returning an error stops the node.
    fn handle(&mut self, ctx: &NodeContext, message: &Message) -> Result<()>;
}

impl<F> Handler for F
where
    F: FnMut(&NodeContext, &Message) -> Result<()>,
{
    fn handle(&mut self, ctx: &NodeContext, message: &Message) -> Result<()> {
        self(ctx, message)
    }
}

/// Run the receive/handle cycle until `kill` or a handler failure
pub fn run_dispatch<H: Handler + ?Sized>(
    ctx: &NodeContext,
    mailbox: &Mailbox,
    handler: &mut H,
) -> Result<()> {
    let mut handled: u64 = 0;

    loop {
        let message = mailbox.get();
        match message.kind() {
            MessageKind::Kill => {
                debug!(
                    address = %ctx.address,
                    from = %message.sender(),
                    handled,
                    left_queued = mailbox.len(),
                    "Kill received, stopping dispatch"
                );
                return Ok(());
            }
            MessageKind::Ping => {
                trace!(address = %ctx.address, "Ping");
                ctx.report_alive();
            }
            kind => {
                if let Err(err) = handler.handle(ctx, &message) {
                    error!(
                        address = %ctx.address,
                        kind = %kind,
                        error = %err,
                        error_kind = err.kind().name(),
                        "Handler failed, stopping node"
                    );
                    return Err(err);
                }
                handled += 1;
            }
        }
    }
}

/// Sender value for messages produced by a context's node
impl From<&NodeContext> for Sender {
    fn from(ctx: &NodeContext) -> Self {
        Sender::Node(ctx.address)
    }
}
