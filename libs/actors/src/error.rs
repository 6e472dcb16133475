//! Runtime Error Types
//!
//! Every failure in the runtime is classified into one of four kinds:
//! - `Fatal`: the node cannot continue (handler failure, unexpected message,
//!   I/O error inside a handler, thread panic)
//! - `NoMessage`: the mailbox probe found nothing; never escapes the blocking API
//! - `Timeout`: the watchdog declared a node stale
//! - `Addressing`: send/register against an invalid or unregistered address

use crate::message::{Address, Message, MessageKind};
use thiserror::Error;

/// Coarse classification of an [`ActorError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Fatal,
    NoMessage,
    Timeout,
    Addressing,
}

impl ErrorKind {
    /// Short name for log fields
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Fatal => "fatal",
            ErrorKind::NoMessage => "no_message",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Addressing => "addressing",
        }
    }
}

/// Main runtime error type
#[derive(Error, Debug)]
pub enum ActorError {
    /// Unrecoverable failure inside a node
    #[error("Fatal error: {message}")]
    Fatal { message: String },

    /// A handler received a message kind it does not understand
    #[error("Node {node} cannot handle {kind} message")]
    UnexpectedMessage { node: Address, kind: MessageKind },

    /// I/O failure inside a handler
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Mailbox currently empty
    #[error("No message available")]
    NoMessage,

    /// Watchdog declared a node stale
    #[error("Node {address} is stale (last seen at {last_seen_ms}ms)")]
    Timeout { address: Address, last_seen_ms: u64 },

    /// Address outside the registry capacity
    #[error("Address {address} out of range (capacity {capacity})")]
    AddressOutOfRange { address: Address, capacity: usize },

    /// Nothing registered at the address
    #[error("Address {address} is not registered")]
    Unregistered { address: Address },

    /// Address bound twice
    #[error("Address {address} is already registered")]
    AlreadyRegistered { address: Address },
}

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, ActorError>;

impl ActorError {
    /// Create a fatal error
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    /// Create an unexpected-message error
    pub fn unexpected(node: Address, kind: MessageKind) -> Self {
        Self::UnexpectedMessage { node, kind }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActorError::Fatal { .. } | ActorError::UnexpectedMessage { .. } | ActorError::Io(_) => {
                ErrorKind::Fatal
            }
            ActorError::NoMessage => ErrorKind::NoMessage,
            ActorError::Timeout { .. } => ErrorKind::Timeout,
            ActorError::AddressOutOfRange { .. }
            | ActorError::Unregistered { .. }
            | ActorError::AlreadyRegistered { .. } => ErrorKind::Addressing,
        }
    }

    pub fn is_addressing(&self) -> bool {
        self.kind() == ErrorKind::Addressing
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }
}

/// Failed delivery. Hands the undelivered message back to the caller.
#[derive(Debug)]
pub struct SendError {
    pub message: Message,
    pub reason: ActorError,
}

impl SendError {
    pub(crate) fn new(message: Message, reason: ActorError) -> Self {
        Self { message, reason }
    }

    /// Recover the undelivered message
    pub fn into_message(self) -> Message {
        self.message
    }
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to deliver {} message: {}", self.message.kind(), self.reason)
    }
}

impl std::error::Error for SendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.reason)
    }
}

impl From<SendError> for ActorError {
    fn from(err: SendError) -> Self {
        err.reason
    }
}
