//! Transport abstraction
//!
//! A transport moves multipart frame lists over five named channels. It
//! knows nothing about message contents; [`TransportExt`] layers the
//! session framing on top.

use crate::error::{KernelError, TransportError};
use core_types::Identity;
use ipc::{Frames, Message, Session};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named communication channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    /// Request/reply, routed by identity
    Shell,
    /// Broadcast of side effects (streams, pyin, pyout, pyerr)
    IoPub,
    /// Kernel-initiated input requests, routed by identity
    Stdin,
    /// Reserved for out-of-band requests
    Control,
    /// Echo for liveness checks
    Heartbeat,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Shell,
        Channel::IoPub,
        Channel::Stdin,
        Channel::Control,
        Channel::Heartbeat,
    ];

    /// Returns the channel name
    pub const fn name(&self) -> &'static str {
        match self {
            Channel::Shell => "shell",
            Channel::IoPub => "iopub",
            Channel::Stdin => "stdin",
            Channel::Control => "control",
            Channel::Heartbeat => "heartbeat",
        }
    }

    /// Returns whether outbound frames are addressed by a leading identity
    pub const fn is_routed(&self) -> bool {
        matches!(self, Channel::Shell | Channel::Stdin | Channel::Control)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a receive behaves when nothing is pending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvMode {
    /// Wait until a frame list arrives
    Blocking,
    /// Return `Ok(None)` immediately
    NonBlocking,
}

/// Frame-level transport
pub trait Transport {
    /// Sends one multipart frame list on a channel
    fn send(&mut self, channel: Channel, frames: Frames) -> Result<(), TransportError>;

    /// Receives one multipart frame list from a channel
    ///
    /// A blocking receive only returns `Ok(None)` if the transport was
    /// interrupted; a disconnected peer is an error.
    fn recv(&mut self, channel: Channel, mode: RecvMode) -> Result<Option<Frames>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, channel: Channel, frames: Frames) -> Result<(), TransportError> {
        (**self).send(channel, frames)
    }

    fn recv(&mut self, channel: Channel, mode: RecvMode) -> Result<Option<Frames>, TransportError> {
        (**self).recv(channel, mode)
    }
}

/// Message-level helpers for any transport
pub trait TransportExt: Transport {
    /// Serializes and sends a message
    fn send_message(
        &mut self,
        session: &Session,
        channel: Channel,
        message: &Message,
        identities: &[Identity],
    ) -> Result<(), KernelError> {
        let frames = session.serialize(message, identities)?;
        tracing::trace!(%channel, msg_type = message.msg_type(), "sending message");
        self.send(channel, frames)?;
        Ok(())
    }

    /// Receives and decodes a message
    fn recv_message(
        &mut self,
        session: &Session,
        channel: Channel,
        mode: RecvMode,
    ) -> Result<Option<(Vec<Identity>, Message)>, KernelError> {
        match self.recv(channel, mode)? {
            Some(frames) => Ok(Some(session.deserialize(frames)?)),
            None => Ok(None),
        }
    }
}

impl<T: Transport + ?Sized> TransportExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names() {
        let names: Vec<&str> = Channel::ALL.iter().map(Channel::name).collect();
        assert_eq!(names, vec!["shell", "iopub", "stdin", "control", "heartbeat"]);
        assert_eq!(Channel::IoPub.to_string(), "iopub");
    }

    #[test]
    fn test_routed_channels() {
        assert!(Channel::Shell.is_routed());
        assert!(Channel::Stdin.is_routed());
        assert!(!Channel::IoPub.is_routed());
        assert!(!Channel::Heartbeat.is_routed());
    }
}
