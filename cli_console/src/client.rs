//! # Kernel Client
//!
//! The frontend half of the protocol.
//!
//! A request is sent on the shell channel and the client then waits for the
//! reply whose parent is that request. While waiting it answers input
//! requests through the configured handler and collects iopub messages. Only
//! iopub messages caused by the request are attributed to it; anything else
//! is kept for [`KernelClient::take_unattributed`].

use core_types::MessageId;
use ipc::{ErrorContent, ExecuteReply, Message, MsgType, Session};
use kernel_api::{Channel, KernelError, KernelPorts, RecvMode, Transport, TransportError, TransportExt};
use serde_json::{json, Value};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("No {msg_type} within {waited:?}")]
    Timeout { msg_type: String, waited: Duration },

    #[error("Unexpected reply: expected {expected}, got {actual}")]
    UnexpectedReply { expected: String, actual: String },

    #[error("Malformed {msg_type}: {source}")]
    MalformedReply {
        msg_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Answers an input request; receives the prompt, returns the line
pub type InputHandler = Box<dyn FnMut(&str) -> String>;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User name on outgoing messages
    pub username: String,
    /// Signing key shared with the kernel
    pub key: Option<Vec<u8>>,
    /// Pause between polls while waiting
    pub poll_interval: Duration,
    /// Longest wait for a reply
    pub reply_timeout: Duration,
    /// How long to keep collecting output after a reply arrives
    pub output_grace: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            username: "frontend".to_string(),
            key: None,
            poll_interval: Duration::from_millis(2),
            reply_timeout: Duration::from_secs(60),
            output_grace: Duration::from_millis(50),
        }
    }
}

impl ClientConfig {
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn with_output_grace(mut self, grace: Duration) -> Self {
        self.output_grace = grace;
        self
    }
}

/// A reply plus the iopub messages its request caused
#[derive(Debug, Clone)]
pub struct Reply {
    pub reply: Message,
    pub outputs: Vec<Message>,
}

impl Reply {
    /// `status` field of the reply content
    pub fn status(&self) -> Option<&str> {
        self.reply.content_str("status")
    }

    /// Concatenated text of one output stream
    pub fn stream(&self, name: &str) -> String {
        self.outputs
            .iter()
            .filter(|m| m.msg_type() == MsgType::Stream.as_str())
            .filter(|m| m.content_str("name") == Some(name))
            .filter_map(|m| m.content_str("data"))
            .collect()
    }

    /// Plain-text form of the displayed result, if any
    pub fn result(&self) -> Option<&str> {
        self.outputs
            .iter()
            .find(|m| m.msg_type() == MsgType::Pyout.as_str())
            .and_then(|m| m.content["data"]["text/plain"].as_str())
    }

    /// Error details when execution failed
    pub fn error(&self) -> Option<ErrorContent> {
        match serde_json::from_value(self.reply.content.clone()) {
            Ok(ExecuteReply::Error(error)) => Some(error),
            _ => None,
        }
    }
}

/// Frontend connection to a kernel
pub struct KernelClient<T: Transport> {
    transport: T,
    session: Session,
    config: ClientConfig,
    input_handler: Option<InputHandler>,
    unattributed: Vec<Message>,
}

impl<T: Transport> KernelClient<T> {
    /// Creates a client over an already connected transport
    pub fn new(transport: T, config: ClientConfig) -> Self {
        let mut session = Session::new(config.username.clone());
        if let Some(key) = &config.key {
            session = session.with_key(key.clone());
        }
        Self {
            transport,
            session,
            config,
            input_handler: None,
            unattributed: Vec::new(),
        }
    }

    /// Sets the handler that answers `input_request`s
    pub fn with_input_handler(mut self, handler: impl FnMut(&str) -> String + 'static) -> Self {
        self.input_handler = Some(Box::new(handler));
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Runs code
    pub fn execute(&mut self, code: &str) -> Result<Reply, ClientError> {
        self.request(MsgType::ExecuteRequest, json!({ "code": code }))
    }

    /// Completion matches for `text` on `line`
    pub fn complete(&mut self, text: &str, line: &str) -> Result<Vec<String>, ClientError> {
        let reply = self.request(MsgType::CompleteRequest, json!({ "text": text, "line": line }))?;
        let content: ipc::CompleteReply = parse(&reply.reply)?;
        Ok(content.matches)
    }

    /// Docstring of a dotted name; empty when nothing resolves
    pub fn object_info(&mut self, oname: &str) -> Result<String, ClientError> {
        let reply = self.request(MsgType::ObjectInfoRequest, json!({ "oname": oname }))?;
        let content: ipc::ObjectInfoReply = parse(&reply.reply)?;
        Ok(content.docstring)
    }

    /// Ports the kernel recorded, if any
    pub fn connect_info(&mut self) -> Result<Option<KernelPorts>, ClientError> {
        let reply = self.request(MsgType::ConnectRequest, json!({}))?;
        if reply.reply.content.as_object().is_some_and(|map| map.is_empty()) {
            return Ok(None);
        }
        parse(&reply.reply).map(Some)
    }

    /// Asks the kernel to stop
    pub fn shutdown(&mut self, restart: bool) -> Result<Reply, ClientError> {
        self.request(MsgType::ShutdownRequest, json!({ "restart": restart }))
    }

    /// Sends a shell request and waits for its reply
    pub fn request(&mut self, msg_type: MsgType, content: Value) -> Result<Reply, ClientError> {
        let request = self.session.msg(msg_type, content, None);
        self.transport
            .send_message(&self.session, Channel::Shell, &request, &[])?;
        tracing::debug!(msg_type = %msg_type, msg_id = %request.msg_id(), "sent request");

        let expected = MsgType::reply_name_for(msg_type.as_str());
        let reply = self.wait_for_reply(&request, &expected)?;
        let outputs = self.collect_outputs(request.msg_id())?;
        Ok(Reply { reply, outputs })
    }

    /// Iopub messages that did not belong to any request
    pub fn take_unattributed(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.unattributed)
    }

    fn wait_for_reply(&mut self, request: &Message, expected: &str) -> Result<Message, ClientError> {
        let started = Instant::now();
        let mut outputs = Vec::new();
        loop {
            self.answer_input()?;
            self.poll_iopub(&mut outputs)?;

            if let Some((_, reply)) =
                self.transport
                    .recv_message(&self.session, Channel::Shell, RecvMode::NonBlocking)?
            {
                if reply.parent_id() != Some(request.msg_id()) {
                    tracing::warn!(msg_type = reply.msg_type(), "reply to another request");
                    continue;
                }
                if reply.msg_type() != expected {
                    return Err(ClientError::UnexpectedReply {
                        expected: expected.to_string(),
                        actual: reply.msg_type().to_string(),
                    });
                }
                self.unattributed.extend(outputs);
                return Ok(reply);
            }

            if started.elapsed() > self.config.reply_timeout {
                return Err(ClientError::Timeout {
                    msg_type: expected.to_string(),
                    waited: self.config.reply_timeout,
                });
            }
            thread::sleep(self.config.poll_interval);
        }
    }

    /// Collects output for `parent` until none has arrived for the grace period
    fn collect_outputs(&mut self, parent: MessageId) -> Result<Vec<Message>, ClientError> {
        let mut pending = std::mem::take(&mut self.unattributed);
        let mut quiet_since = Instant::now();
        loop {
            let before = pending.len();
            self.poll_iopub(&mut pending)?;
            if pending.len() > before {
                quiet_since = Instant::now();
            } else if quiet_since.elapsed() >= self.config.output_grace {
                break;
            } else {
                thread::sleep(self.config.poll_interval);
            }
        }

        let (outputs, others): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .partition(|m| m.parent_id() == Some(parent));
        self.unattributed = others;
        Ok(outputs)
    }

    fn poll_iopub(&mut self, into: &mut Vec<Message>) -> Result<(), ClientError> {
        while let Some((_, message)) =
            self.transport
                .recv_message(&self.session, Channel::IoPub, RecvMode::NonBlocking)?
        {
            tracing::trace!(msg_type = message.msg_type(), "iopub");
            into.push(message);
        }
        Ok(())
    }

    fn answer_input(&mut self) -> Result<(), ClientError> {
        while let Some((_, request)) =
            self.transport
                .recv_message(&self.session, Channel::Stdin, RecvMode::NonBlocking)?
        {
            if request.msg_type() != MsgType::InputRequest.as_str() {
                tracing::warn!(msg_type = request.msg_type(), "unexpected message on stdin");
                continue;
            }
            let prompt = request.content_str("prompt").unwrap_or_default();
            let value = match self.input_handler.as_mut() {
                Some(handler) => handler(prompt),
                None => {
                    tracing::warn!(prompt, "no input handler, answering with an empty line");
                    String::new()
                }
            };
            let reply = self
                .session
                .msg(MsgType::InputReply, json!({ "value": value }), Some(&request.header));
            self.transport
                .send_message(&self.session, Channel::Stdin, &reply, &[])?;
        }
        Ok(())
    }
}

impl<T: Transport> std::fmt::Debug for KernelClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelClient")
            .field("config", &self.config)
            .field("unattributed", &self.unattributed.len())
            .finish_non_exhaustive()
    }
}

fn parse<C: for<'de> serde::Deserialize<'de>>(message: &Message) -> Result<C, ClientError> {
    message
        .content_as()
        .map_err(|source| ClientError::MalformedReply {
            msg_type: message.msg_type().to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_api::MemoryTransport;

    fn kernel_message(msg_type: MsgType, content: Value, parent: Option<&Message>) -> Message {
        Session::new("kernel").msg(msg_type, content, parent.map(|m| &m.header))
    }

    #[test]
    fn test_reply_helpers() {
        let request = kernel_message(MsgType::ExecuteRequest, json!({ "code": "" }), None);
        let reply = Reply {
            reply: kernel_message(
                MsgType::ExecuteReply,
                json!({
                    "status": "error",
                    "ename": "NameError",
                    "evalue": "name 'y' is not defined",
                    "traceback": ["NameError: name 'y' is not defined"],
                }),
                Some(&request),
            ),
            outputs: vec![
                kernel_message(MsgType::Stream, json!({ "name": "stdout", "data": "a" }), Some(&request)),
                kernel_message(MsgType::Stream, json!({ "name": "stderr", "data": "e" }), Some(&request)),
                kernel_message(MsgType::Stream, json!({ "name": "stdout", "data": "b" }), Some(&request)),
            ],
        };

        assert_eq!(reply.status(), Some("error"));
        assert_eq!(reply.stream("stdout"), "ab");
        assert_eq!(reply.stream("stderr"), "e");
        assert_eq!(reply.result(), None);
        assert_eq!(reply.error().unwrap().ename, "NameError");
    }

    #[test]
    fn test_timeout_without_kernel() {
        let config = ClientConfig::default()
            .with_reply_timeout(Duration::from_millis(20))
            .with_output_grace(Duration::ZERO);
        let mut client = KernelClient::new(MemoryTransport::new(), config);

        let err = client.execute("1").unwrap_err();
        assert!(matches!(err, ClientError::Timeout { ref msg_type, .. } if msg_type == "execute_reply"));
    }
}
