//! Kernel error types

use crate::transport::Channel;
use ipc::SessionError;
use thiserror::Error;

/// Errors raised by a transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer side of a channel is gone
    #[error("Channel {0} is disconnected")]
    Disconnected(Channel),

    /// The transport does not carry this channel
    #[error("Channel {0} is not supported by this transport")]
    UnsupportedChannel(Channel),

    /// A bounded queue refused a frame list
    #[error("Queue for channel {0} is full")]
    QueueFull(Channel),

    /// Frames could not be routed to a peer
    #[error("No route for identity {0}")]
    NoRoute(String),

    /// Socket level failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while the kernel serves requests
#[derive(Debug, Error)]
pub enum KernelError {
    /// Transport failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frames could not be decoded into a message
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Content could not be encoded
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// A request lacks a required field
    #[error("Malformed {msg_type}: {reason}")]
    MalformedRequest { msg_type: String, reason: String },

    /// No handler is registered for a message type
    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    /// A write or flush hit a closed stream
    #[error("I/O operation on closed stream {0}")]
    StreamClosed(String),

    /// The operation is not offered by this object
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// An input reply did not have the expected shape
    #[error("Input protocol error: {0}")]
    InputProtocol(String),
}

impl KernelError {
    /// Builds a malformed request error
    pub fn malformed(msg_type: impl Into<String>, reason: impl Into<String>) -> Self {
        KernelError::MalformedRequest {
            msg_type: msg_type.into(),
            reason: reason.into(),
        }
    }

    /// Returns whether the error means the transport is gone for good
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            KernelError::Transport(TransportError::Disconnected(_))
        )
    }
}
