//! Node Lifecycle
//!
//! A node is one OS thread bound to one mailbox at one address. It runs until
//! its body returns: normally after processing `kill`, or early when its
//! handler fails. Joining a node returns that exit status and drains whatever
//! was still queued.

use crate::dispatch::{run_dispatch, Handler, NodeContext};
use crate::error::{ActorError, Result};
use crate::mailbox::Mailbox;
use crate::message::Address;
use crate::registry::Registry;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info};

/// Running node: address, thread handle and mailbox handle
pub struct Node {
    address: Address,
    name: String,
    mailbox: Mailbox,
    thread: JoinHandle<Result<()>>,
}

impl Node {
    /// Register `address` and run `body` with its mailbox on a new thread
    pub fn spawn<F>(
        registry: &Arc<Registry>,
        address: Address,
        name: impl Into<String>,
        body: F,
    ) -> Result<Node>
    where
        F: FnOnce(Mailbox) -> Result<()> + Send + 'static,
    {
        let name = name.into();
        let mailbox = registry.register(address)?;

        let thread = thread::Builder::new().name(name.clone()).spawn({
            let mailbox = mailbox.clone();
            let name = name.clone();
            move || {
                let started = Instant::now();
                debug!(node = %name, address = %address, "Node thread started");
                let status = body(mailbox);
                match &status {
                    Ok(()) => info!(
                        node = %name,
                        address = %address,
                        runtime_ms = started.elapsed().as_millis() as u64,
                        "Node stopped"
                    ),
                    Err(err) => error!(
                        node = %name,
                        address = %address,
                        error = %err,
                        error_kind = err.kind().name(),
                        "Node failed"
                    ),
                }
                status
            }
        })?;

        Ok(Node {
            address,
            name,
            mailbox,
            thread,
        })
    }

    /// Start a node that runs `handler` behind the generic dispatch loop
    pub fn spawn_handler<H>(
        registry: &Arc<Registry>,
        address: Address,
        name: impl Into<String>,
        watchdog: Address,
        mut handler: H,
    ) -> Result<Node>
    where
        H: Handler + Send + 'static,
    {
        let ctx = NodeContext::new(address, watchdog, Arc::clone(registry));
        Node::spawn(registry, address, name, move |mailbox| {
            run_dispatch(&ctx, &mailbox, &mut handler)
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Whether the node's thread has returned
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the node to stop, then drain its mailbox
    pub fn join(self) -> Result<()> {
        let status = match self.thread.join() {
            Ok(status) => status,
            Err(panic) => Err(ActorError::fatal(format!(
                "node {} panicked: {}",
                self.name,
                panic_message(panic.as_ref())
            ))),
        };

        let drained = self.mailbox.drain();
        debug!(node = %self.name, address = %self.address, drained, "Mailbox drained");
        status
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(text) = panic.downcast_ref::<&str>() {
        text
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text
    } else {
        "unknown panic"
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("address", &self.address)
            .field("name", &self.name)
            .field("mailbox", &self.mailbox)
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::message::{Body, Message, MessageKind, Sender};
    use std::time::Duration;

    const WATCHDOG: Address = Address::new(0);

    #[test]
    fn test_kill_stops_node_and_join_drains() {
        let registry = Arc::new(Registry::default());
        let node = Node::spawn_handler(
            &registry,
            Address::new(1),
            "sleepy",
            WATCHDOG,
            |_: &NodeContext, _: &Message| -> Result<()> {
                std::thread::sleep(Duration::from_millis(20));
                Ok(())
            },
        )
        .unwrap();

        registry.send(Address::new(1), Message::query(Sender::External)).unwrap();
        registry.kill(Address::new(1)).unwrap();
        registry.send(Address::new(1), Message::query(Sender::External)).unwrap();

        let mailbox = node.mailbox().clone();
        assert!(node.join().is_ok());
        assert!(mailbox.is_empty());
    }

    #[test]
    fn test_handler_failure_is_reported_at_join() {
        let registry = Arc::new(Registry::default());
        let node = Node::spawn_handler(
            &registry,
            Address::new(2),
            "strict",
            WATCHDOG,
            |ctx: &NodeContext, message: &Message| -> Result<()> {
                Err(ActorError::unexpected(ctx.address(), message.kind()))
            },
        )
        .unwrap();

        registry.send(Address::new(2), Message::print(Sender::External, vec![1.0])).unwrap();
        let err = node.join().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert!(matches!(
            err,
            ActorError::UnexpectedMessage {
                kind: MessageKind::Print,
                ..
            }
        ));
    }

    #[test]
    fn test_panic_becomes_fatal() {
        let registry = Arc::new(Registry::default());
        let node = Node::spawn(&registry, Address::new(3), "panicky", |_mailbox| {
            panic!("boom");
        })
        .unwrap();

        let err = node.join().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_spawn_on_taken_address_fails() {
        let registry = Arc::new(Registry::default());
        let first = Node::spawn(&registry, Address::new(4), "first", |mailbox| {
            mailbox.get();
            Ok(())
        })
        .unwrap();

        let err = Node::spawn(&registry, Address::new(4), "second", |_| Ok(())).unwrap_err();
        assert!(err.is_addressing());

        registry.kill(Address::new(4)).unwrap();
        first.join().unwrap();
    }

    #[test]
    fn test_self_kill() {
        let registry = Arc::new(Registry::default());
        let node = Node::spawn_handler(
            &registry,
            Address::new(1),
            "quitter",
            WATCHDOG,
            |ctx: &NodeContext, message: &Message| -> Result<()> {
                match message.body() {
                    Body::Query => ctx.kill(ctx.address()),
                    _ => Ok(()),
                }
            },
        )
        .unwrap();

        registry.send(Address::new(1), Message::query(Sender::External)).unwrap();
        assert!(node.join().is_ok());
    }
}
