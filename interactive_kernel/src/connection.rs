//! Transport plus session
//!
//! Every message the kernel emits is built by its [`Session`] and sent
//! through its transport. [`Connection`] keeps the two together; output
//! sinks only see the narrower [`Publisher`] side of it.

use core_types::Identity;
use ipc::{Header, Message, MsgType, Session};
use kernel_api::{Channel, KernelError, RecvMode, Transport, TransportExt};
use serde_json::Value;

/// Broadcasts messages on the iopub channel
pub trait Publisher {
    /// Publishes one message tagged with `parent`
    fn publish(
        &mut self,
        msg_type: MsgType,
        content: Value,
        parent: Option<&Header>,
    ) -> Result<(), KernelError>;
}

/// A kernel's transport and session
#[derive(Debug)]
pub struct Connection<T: Transport> {
    transport: T,
    session: Session,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T, session: Session) -> Self {
        Self { transport, session }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Builds a message and sends it on `channel` behind `identities`
    pub fn send(
        &mut self,
        channel: Channel,
        identities: &[Identity],
        msg_type: impl Into<String>,
        content: Value,
        parent: Option<&Header>,
    ) -> Result<Message, KernelError> {
        let message = self.session.msg(msg_type, content, parent);
        self.transport
            .send_message(&self.session, channel, &message, identities)?;
        Ok(message)
    }

    /// Receives and decodes the next message on `channel`
    pub fn recv(
        &mut self,
        channel: Channel,
        mode: RecvMode,
    ) -> Result<Option<(Vec<Identity>, Message)>, KernelError> {
        self.transport.recv_message(&self.session, channel, mode)
    }
}

impl<T: Transport> Publisher for Connection<T> {
    fn publish(
        &mut self,
        msg_type: MsgType,
        content: Value,
        parent: Option<&Header>,
    ) -> Result<(), KernelError> {
        self.send(Channel::IoPub, &[], msg_type, content, parent)
            .map(|_| ())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Publisher that records what it was given
    #[derive(Debug, Default)]
    pub struct RecordingPublisher {
        pub published: Vec<(MsgType, Value, Option<Header>)>,
    }

    impl Publisher for RecordingPublisher {
        fn publish(
            &mut self,
            msg_type: MsgType,
            content: Value,
            parent: Option<&Header>,
        ) -> Result<(), KernelError> {
            self.published.push((msg_type, content, parent.cloned()));
            Ok(())
        }
    }
}
