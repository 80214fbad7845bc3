//! Execution host
//!
//! Running code reaches the outside world only through the
//! [`script_engine::Host`] it is given. [`ExecutionHost`] is the kernel's
//! host for one execute request: writes go to the request-tagged output
//! streams and input is requested from the frontend over the stdin channel.

use crate::connection::Connection;
use crate::kernel::KernelState;
use crate::outstream::OutStream;
use core_types::Identity;
use ipc::{Header, InputReply, InputRequest, MsgType};
use kernel_api::{Channel, KernelError, RecvMode, Transport};
use script_engine::{Host, HostError, StreamName};

/// Host capability lent to the interpreter for one execution
pub struct ExecutionHost<'a, T: Transport> {
    pub(crate) connection: &'a mut Connection<T>,
    pub(crate) stdout: &'a mut OutStream,
    pub(crate) stderr: &'a mut OutStream,
    pub(crate) state: &'a mut KernelState,
    /// Header of the execute request being served
    pub(crate) parent: &'a Header,
    /// Routing prefix of the requesting frontend
    pub(crate) identities: &'a [Identity],
}

impl<'a, T: Transport> ExecutionHost<'a, T> {
    /// Sends `input_request` and blocks for the matching reply
    fn request_input(&mut self, prompt: &str) -> Result<String, KernelError> {
        let content = serde_json::to_value(InputRequest {
            prompt: prompt.to_string(),
        })?;
        self.connection.send(
            Channel::Stdin,
            self.identities,
            MsgType::InputRequest,
            content,
            Some(self.parent),
        )?;

        loop {
            let reply = match self.connection.recv(Channel::Stdin, RecvMode::Blocking) {
                Ok(Some((_, reply))) => reply,
                Ok(None) => continue,
                Err(KernelError::Session(err)) => {
                    return Err(KernelError::InputProtocol(err.to_string()))
                }
                Err(err) => return Err(err),
            };
            if reply.msg_type() != MsgType::InputReply.as_str() {
                tracing::warn!(msg_type = reply.msg_type(), "ignoring unexpected message on stdin");
                continue;
            }
            return match reply.content_as::<InputReply>() {
                Ok(reply) => Ok(reply.value),
                Err(err) => Err(KernelError::InputProtocol(err.to_string())),
            };
        }
    }
}

fn host_error(err: KernelError) -> HostError {
    match err {
        KernelError::StreamClosed(_) => HostError::Closed,
        other => HostError::Other(other.to_string()),
    }
}

impl<'a, T: Transport> Host for ExecutionHost<'a, T> {
    fn write(&mut self, stream: StreamName, text: &str) -> Result<(), HostError> {
        let connection = &mut *self.connection;
        let out = match stream {
            StreamName::Stdout => &mut *self.stdout,
            StreamName::Stderr => &mut *self.stderr,
        };
        out.write(connection, text).map_err(host_error)
    }

    fn flush(&mut self, stream: StreamName) -> Result<(), HostError> {
        let connection = &mut *self.connection;
        let out = match stream {
            StreamName::Stdout => &mut *self.stdout,
            StreamName::Stderr => &mut *self.stderr,
        };
        out.flush(connection).map_err(host_error)
    }

    fn read_line(&mut self, prompt: &str) -> Result<String, HostError> {
        self.flush(StreamName::Stderr)?;
        self.flush(StreamName::Stdout)?;

        self.state.transition(KernelState::AwaitingInput);
        let result = self.request_input(prompt);
        self.state.transition(KernelState::Busy);

        match result {
            Ok(value) => Ok(value),
            Err(KernelError::InputProtocol(reason)) => {
                tracing::error!(%reason, "malformed input reply, using empty string");
                Ok(String::new())
            }
            Err(err) if err.is_disconnect() => {
                tracing::error!(error = %err, "stdin channel closed while waiting for input");
                Err(HostError::Eof)
            }
            Err(err) => {
                tracing::error!(error = %err, "input request failed");
                Err(HostError::Other(err.to_string()))
            }
        }
    }
}
