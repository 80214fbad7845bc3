//! Test utilities
//!
//! [`KernelHarness`] wires a kernel to an in-memory transport and a manual
//! clock and plays the frontend side: it injects requests, answers input
//! requests and collects whatever the kernel sent.

use crate::config::KernelConfig;
use crate::kernel::{Flow, Kernel};
use core_types::Identity;
use ipc::{Message, MsgType, Session};
use kernel_api::{Channel, KernelError, ManualClock, MemoryTransport};
use serde_json::{json, Value};
use std::rc::Rc;

/// Key shared by both ends of a harness
pub const HARNESS_KEY: &[u8] = b"harness-key";

/// A kernel plus a scripted frontend
pub struct KernelHarness {
    pub kernel: Kernel<MemoryTransport>,
    pub transport: MemoryTransport,
    pub clock: ManualClock,
    pub client: Session,
    pub identity: Identity,
}

impl KernelHarness {
    /// Creates a harness with the default kernel configuration
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    pub fn with_config(config: KernelConfig) -> Self {
        let transport = MemoryTransport::new();
        let clock = ManualClock::new();
        let kernel = Kernel::with_config(
            transport.clone(),
            Session::new("kernel").with_key(HARNESS_KEY),
            config,
            Rc::new(clock.clone()),
        );
        Self {
            kernel,
            transport,
            clock,
            client: Session::new("frontend").with_key(HARNESS_KEY),
            identity: Identity::from("frontend"),
        }
    }

    /// Queues a request on the shell channel without running the kernel
    pub fn send(&mut self, msg_type: impl Into<String>, content: Value) -> Result<Message, KernelError> {
        let request = self.client.msg(msg_type, content, None);
        self.transport.inject(
            &self.client,
            Channel::Shell,
            &request,
            std::slice::from_ref(&self.identity),
        )?;
        Ok(request)
    }

    /// Queues an `execute_request`
    pub fn send_execute(&mut self, code: &str) -> Result<Message, KernelError> {
        self.send(MsgType::ExecuteRequest, json!({ "code": code }))
    }

    /// Queues an `input_reply` for the next input request
    pub fn queue_input(&mut self, value: &str) -> Result<Message, KernelError> {
        let reply = self
            .client
            .msg(MsgType::InputReply, json!({ "value": value }), None);
        self.transport.inject(
            &self.client,
            Channel::Stdin,
            &reply,
            std::slice::from_ref(&self.identity),
        )?;
        Ok(reply)
    }

    /// Lets the kernel handle everything queued
    pub fn run(&mut self) -> Result<Flow, KernelError> {
        self.kernel.run_pending()
    }

    /// Sends one execute request and runs the kernel
    pub fn execute(&mut self, code: &str) -> Result<Message, KernelError> {
        let request = self.send_execute(code)?;
        self.run()?;
        Ok(request)
    }

    /// Messages the kernel sent on `channel` since the last call
    pub fn take(&self, channel: Channel) -> Result<Vec<Message>, KernelError> {
        Ok(self
            .transport
            .take_messages(&self.client, channel)?
            .into_iter()
            .map(|(_, message)| message)
            .collect())
    }

    pub fn shell(&self) -> Result<Vec<Message>, KernelError> {
        self.take(Channel::Shell)
    }

    pub fn iopub(&self) -> Result<Vec<Message>, KernelError> {
        self.take(Channel::IoPub)
    }

    pub fn stdin(&self) -> Result<Vec<Message>, KernelError> {
        self.take(Channel::Stdin)
    }
}

impl Default for KernelHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Concatenates the `data` of every `stream` message named `name`
pub fn stream_text(messages: &[Message], name: &str) -> String {
    messages
        .iter()
        .filter(|message| message.msg_type() == MsgType::Stream.as_str())
        .filter(|message| message.content_str("name") == Some(name))
        .filter_map(|message| message.content_str("data"))
        .collect()
}

/// Wire types of `messages`, in order
pub fn msg_types(messages: &[Message]) -> Vec<&str> {
    messages.iter().map(Message::msg_type).collect()
}
