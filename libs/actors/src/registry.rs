//! Node Registry
//!
//! Maps small integer addresses to mailbox handles. Each slot is a one-time
//! initialization cell: an address is bound exactly once during startup and
//! is read-only afterwards, so `send` from any thread never takes a lock on
//! the registry itself.

use crate::error::{ActorError, Result, SendError};
use crate::mailbox::Mailbox;
use crate::message::{Address, Message, Sender};
use once_cell::sync::OnceCell;
use std::fmt;
use tracing::{debug, trace};

/// Default number of addressable nodes
pub const DEFAULT_CAPACITY: usize = 5;

/// Address → mailbox mapping shared by every node
pub struct Registry {
    slots: Box<[OnceCell<Mailbox>]>,
}

impl Registry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| OnceCell::new()).collect(),
        }
    }

    /// Number of addressable slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Create a mailbox and bind it to `address`.
    ///
    /// Fails with an addressing error if the address is out of range or
    /// already bound.
    pub fn register(&self, address: Address) -> Result<Mailbox> {
        let slot = self.slot(address)?;
        let mailbox = Mailbox::new();
        slot.set(mailbox.clone())
            .map_err(|_| ActorError::AlreadyRegistered { address })?;
        debug!(address = %address, "Registered node mailbox");
        Ok(mailbox)
    }

    /// Look up the mailbox bound to `address`
    pub fn mailbox(&self, address: Address) -> Result<&Mailbox> {
        self.slot(address)?
            .get()
            .ok_or(ActorError::Unregistered { address })
    }

    pub fn is_registered(&self, address: Address) -> bool {
        self.mailbox(address).is_ok()
    }

    /// Addresses bound so far, in ascending order
    pub fn registered(&self) -> Vec<Address> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(index, _)| Address::new(index as u16))
            .collect()
    }

    /// Deliver `message` to the mailbox at `address`.
    ///
    /// On failure the message comes back inside the [`SendError`].
    pub fn send(&self, address: Address, message: Message) -> std::result::Result<(), SendError> {
        match self.mailbox(address) {
            Ok(mailbox) => {
                trace!(address = %address, kind = %message.kind(), sender = %message.sender(), "Delivering message");
                mailbox.put(message);
                Ok(())
            }
            Err(reason) => Err(SendError::new(message, reason)),
        }
    }

    /// Ask the node at `address` to stop
    pub fn kill(&self, address: Address) -> std::result::Result<(), SendError> {
        self.kill_from(Sender::External, address)
    }

    /// Ask the node at `address` to stop, on behalf of `sender`
    pub fn kill_from(
        &self,
        sender: impl Into<Sender>,
        address: Address,
    ) -> std::result::Result<(), SendError> {
        self.send(address, Message::kill(sender))
    }

    fn slot(&self, address: Address) -> Result<&OnceCell<Mailbox>> {
        self.slots
            .get(address.index())
            .ok_or(ActorError::AddressOutOfRange {
                address,
                capacity: self.capacity(),
            })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("capacity", &self.capacity())
            .field("registered", &self.registered())
            .finish()
    }
}
