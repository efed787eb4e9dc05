//! Message and error types for the router.
//!
//! These provide a clean API over the underlying tungstenite transport
//! errors so callers never have to depend on the WebSocket crate directly.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Reserved recipient token addressing every registered endpoint.
pub const BROADCAST: &str = "all";

/// A routable message.
///
/// `sender` is informational only; `recipient` is either an exact endpoint
/// id or the [`BROADCAST`] token. The content is an opaque byte payload —
/// the router never inspects it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    pub recipient: String,
    pub content: Vec<u8>,
}

impl Message {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            content: content.into(),
        }
    }

    /// Shorthand for a message addressed to every endpoint.
    pub fn broadcast(sender: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self::new(sender, BROADCAST, content)
    }

    pub fn is_broadcast(&self) -> bool {
        self.recipient == BROADCAST
    }
}

/// Kind of data frame produced by a receive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Text,
    Binary,
}

/// A raw inbound data frame: payload plus how it arrived on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Vec<u8>,
}

/// Router errors.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Register was called with an id that is already live.
    #[error("duplicate registration for id `{0}`")]
    DuplicateId(String),

    /// Unicast delivery was requested for an id that is not registered.
    #[error("non-existent recipient `{0}`")]
    NonExistentRecipient(String),

    /// The dispatch loop has shut down; no further submissions are accepted.
    #[error("router is closed")]
    Closed,

    /// Underlying transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// A send or probe did not complete within its deadline.
    #[error("write deadline exceeded")]
    DeadlineExceeded,

    /// An inbound payload could not be decoded into the requested type.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tungstenite::Error> for RouterError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                Self::ConnectionClosed
            }
            tungstenite::Error::Io(io_err) => Self::Io(io_err),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for RouterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;
