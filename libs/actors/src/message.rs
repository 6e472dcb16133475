//! Node Message Protocol
//!
//! Messages are owned values moved from the sender into exactly one mailbox
//! and from there into exactly one receiver, which drops them after handling.
//! Nothing is shared or reference counted across mailboxes.
//!
//! ## Wire Shape (in-process)
//!
//! ```text
//! kind   | payload
//! -------+---------------------------------
//! kill   | -
//! ping   | -
//! pong   | -
//! query  | -
//! read   | raw bytes (sample text)
//! log    | UTF-8 text
//! print  | per-core load values (f32, %)
//! ```

use bytes::Bytes;
use std::fmt;

/// Small integer identifying a node for routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u16);

impl Address {
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Raw address value
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Slot index in the registry
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for Address {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

/// Origin of a message
///
/// `External` and `Timer` live outside the address space, so they can never be
/// mistaken for a monitored node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    /// A registered node
    Node(Address),
    /// Heartbeat driver, signal wiring or any other non-node producer
    External,
    /// Timer self-wakeup
    Timer,
}

impl Sender {
    /// Node address, if the sender is a node
    pub fn address(self) -> Option<Address> {
        match self {
            Sender::Node(address) => Some(address),
            Sender::External | Sender::Timer => None,
        }
    }
}

impl From<Address> for Sender {
    fn from(address: Address) -> Self {
        Sender::Node(address)
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::Node(address) => write!(f, "{}", address),
            Sender::External => write!(f, "external"),
            Sender::Timer => write!(f, "timer"),
        }
    }
}

/// Payload-free message tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Kill,
    Ping,
    Pong,
    Query,
    Read,
    Print,
    Log,
}

impl MessageKind {
    pub fn name(self) -> &'static str {
        match self {
            MessageKind::Kill => "kill",
            MessageKind::Ping => "ping",
            MessageKind::Pong => "pong",
            MessageKind::Query => "query",
            MessageKind::Read => "read",
            MessageKind::Print => "print",
            MessageKind::Log => "log",
        }
    }

    /// Control messages carry no payload
    pub fn is_control(self) -> bool {
        matches!(
            self,
            MessageKind::Kill | MessageKind::Ping | MessageKind::Pong | MessageKind::Query
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Message body with its typed payload
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Request graceful shutdown of the receiving node
    Kill,
    /// Liveness probe
    Ping,
    /// Liveness report, always addressed to the watchdog
    Pong,
    /// Application-triggered work request
    Query,
    /// Raw sample text
    Read(Bytes),
    /// Computed per-core load in percent
    Print(Vec<f32>),
    /// Log line text
    Log(String),
}

impl Body {
    pub fn kind(&self) -> MessageKind {
        match self {
            Body::Kill => MessageKind::Kill,
            Body::Ping => MessageKind::Ping,
            Body::Pong => MessageKind::Pong,
            Body::Query => MessageKind::Query,
            Body::Read(_) => MessageKind::Read,
            Body::Print(_) => MessageKind::Print,
            Body::Log(_) => MessageKind::Log,
        }
    }
}

/// Unit of communication between nodes
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    sender: Sender,
    body: Body,
}

impl Message {
    pub fn new(sender: impl Into<Sender>, body: Body) -> Self {
        Self {
            sender: sender.into(),
            body,
        }
    }

    pub fn kill(sender: impl Into<Sender>) -> Self {
        Self::new(sender, Body::Kill)
    }

    pub fn ping(sender: impl Into<Sender>) -> Self {
        Self::new(sender, Body::Ping)
    }

    pub fn pong(sender: impl Into<Sender>) -> Self {
        Self::new(sender, Body::Pong)
    }

    pub fn query(sender: impl Into<Sender>) -> Self {
        Self::new(sender, Body::Query)
    }

    pub fn read(sender: impl Into<Sender>, raw: impl Into<Bytes>) -> Self {
        Self::new(sender, Body::Read(raw.into()))
    }

    pub fn log(sender: impl Into<Sender>, text: impl Into<String>) -> Self {
        Self::new(sender, Body::Log(text.into()))
    }

    pub fn print(sender: impl Into<Sender>, loads: Vec<f32>) -> Self {
        Self::new(sender, Body::Print(loads))
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }

    /// Take the payload, consuming the message
    pub fn into_body(self) -> Body {
        self.body
    }

    /// Payload size in bytes (0 for control messages)
    pub fn payload_len(&self) -> usize {
        match &self.body {
            Body::Read(raw) => raw.len(),
            Body::Log(text) => text.len(),
            Body::Print(loads) => loads.len() * std::mem::size_of::<f32>(),
            Body::Kill | Body::Ping | Body::Pong | Body::Query => 0,
        }
    }
}
