//! The kernel: state, dispatch table and main loop

use crate::config::KernelConfig;
use crate::connection::Connection;
use crate::display::{DisplayHook, Formatter};
use crate::outstream::OutStream;
use core_types::Identity;
use ipc::{Message, MsgType, Session};
use kernel_api::{Channel, Clock, KernelError, KernelPorts, RecvMode, SystemClock, Transport};
use script_engine::{Interpreter, Namespace};
use std::collections::HashMap;
use std::rc::Rc;

/// What the main loop does after a request has been handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Shutdown,
}

/// Execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelState {
    /// Waiting for the next request
    Idle,
    /// Serving a request
    Busy,
    /// Running code is blocked on an input reply
    AwaitingInput,
    /// Replying `aborted` to the backlog after an error
    Aborting,
}

impl KernelState {
    pub(crate) fn transition(&mut self, next: KernelState) {
        if *self != next {
            tracing::debug!(from = ?*self, to = ?next, "kernel state change");
            *self = next;
        }
    }
}

/// Requests the kernel serves on the shell channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    Execute,
    Complete,
    ObjectInfo,
    Connect,
    Shutdown,
}

impl RequestType {
    pub const ALL: [RequestType; 5] = [
        RequestType::Execute,
        RequestType::Complete,
        RequestType::ObjectInfo,
        RequestType::Connect,
        RequestType::Shutdown,
    ];

    pub const fn msg_type(&self) -> MsgType {
        match self {
            RequestType::Execute => MsgType::ExecuteRequest,
            RequestType::Complete => MsgType::CompleteRequest,
            RequestType::ObjectInfo => MsgType::ObjectInfoRequest,
            RequestType::Connect => MsgType::ConnectRequest,
            RequestType::Shutdown => MsgType::ShutdownRequest,
        }
    }

    /// Maps a wire message type to a request type
    pub fn from_msg_type(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|request| request.msg_type().as_str() == name)
    }
}

/// A request handler
pub type Handler<T> = fn(&mut Kernel<T>, &[Identity], &Message) -> Flow;

/// Interactive kernel
///
/// Owns the user namespace, the execution history and the output sinks.
/// Requests arrive on the shell channel of the transport; each is decoded
/// and handed to the handler registered for its type.
pub struct Kernel<T: Transport> {
    pub(crate) connection: Connection<T>,
    pub(crate) interpreter: Interpreter,
    pub(crate) user_ns: Namespace,
    pub(crate) history: Vec<String>,
    handlers: HashMap<RequestType, Handler<T>>,
    pub(crate) recorded_ports: Option<KernelPorts>,
    pub(crate) execution_count: u64,
    pub(crate) state: KernelState,
    pub(crate) stdout: OutStream,
    pub(crate) stderr: OutStream,
    pub(crate) display_hook: DisplayHook,
    pub(crate) config: KernelConfig,
    pub(crate) clock: Rc<dyn Clock>,
}

impl<T: Transport> Kernel<T> {
    /// Creates a kernel with the default configuration and the system clock
    pub fn new(transport: T, session: Session) -> Self {
        Self::with_config(
            transport,
            session,
            KernelConfig::default(),
            Rc::new(SystemClock::new()),
        )
    }

    /// Creates a kernel with explicit tunables and time source
    pub fn with_config(
        transport: T,
        session: Session,
        config: KernelConfig,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let handlers = RequestType::ALL
            .into_iter()
            .map(|request| (request, Self::handler_for(request)))
            .collect();

        Self {
            connection: Connection::new(transport, session),
            interpreter: Interpreter::new(),
            user_ns: Namespace::new(),
            history: Vec::new(),
            handlers,
            recorded_ports: None,
            execution_count: 0,
            state: KernelState::Idle,
            stdout: OutStream::new("stdout", config.flush_interval, Rc::clone(&clock)),
            stderr: OutStream::new("stderr", config.flush_interval, Rc::clone(&clock)),
            display_hook: DisplayHook::default(),
            config,
            clock,
        }
    }

    /// Replaces the formatter used for cell results
    pub fn with_formatter(mut self, formatter: Box<dyn Formatter>) -> Self {
        self.display_hook = DisplayHook::new(formatter);
        self
    }

    fn handler_for(request: RequestType) -> Handler<T> {
        match request {
            RequestType::Execute => Self::execute_request,
            RequestType::Complete => Self::complete_request,
            RequestType::ObjectInfo => Self::object_info_request,
            RequestType::Connect => Self::connect_request,
            RequestType::Shutdown => Self::shutdown_request,
        }
    }

    /// Stores the ports the transport is bound to
    pub fn record_ports(&mut self, ports: KernelPorts) {
        tracing::debug!(?ports, "recorded ports");
        self.recorded_ports = Some(ports);
    }

    pub fn recorded_ports(&self) -> Option<KernelPorts> {
        self.recorded_ports
    }

    pub fn state(&self) -> KernelState {
        self.state
    }

    /// Number of execute requests that carried code
    pub fn execution_count(&self) -> u64 {
        self.execution_count
    }

    /// Executed inputs, oldest first
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn namespace(&self) -> &Namespace {
        &self.user_ns
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        self.connection.session()
    }

    pub fn transport(&self) -> &T {
        self.connection.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.connection.transport_mut()
    }

    /// Returns whether a handler is registered for `msg_type`
    pub fn handles(&self, msg_type: &str) -> bool {
        RequestType::from_msg_type(msg_type).is_some_and(|request| self.handlers.contains_key(&request))
    }

    /// Serves requests until a shutdown request
    ///
    /// Returns an error only when the transport fails, e.g. when the shell
    /// channel is disconnected.
    pub fn start(&mut self) -> Result<(), KernelError> {
        tracing::info!(session = %self.session().id(), "kernel started");
        loop {
            if self.poll_once(RecvMode::Blocking)? == Some(Flow::Shutdown) {
                tracing::info!("kernel loop finished");
                return Ok(());
            }
        }
    }

    /// Receives and handles at most one request
    ///
    /// Returns `None` when no request was pending.
    pub fn poll_once(&mut self, mode: RecvMode) -> Result<Option<Flow>, KernelError> {
        let (identities, request) = match self.connection.recv(Channel::Shell, mode) {
            Ok(Some(received)) => received,
            Ok(None) => return Ok(None),
            Err(KernelError::Session(err)) => {
                tracing::warn!(error = %err, "dropping undecodable request");
                return Ok(Some(Flow::Continue));
            }
            Err(err) => return Err(err),
        };
        Ok(Some(self.dispatch(&identities, &request)))
    }

    /// Handles every request already pending without blocking
    pub fn run_pending(&mut self) -> Result<Flow, KernelError> {
        while let Some(flow) = self.poll_once(RecvMode::NonBlocking)? {
            if flow == Flow::Shutdown {
                return Ok(Flow::Shutdown);
            }
        }
        Ok(Flow::Continue)
    }

    /// Routes one decoded request to its handler
    pub fn dispatch(&mut self, identities: &[Identity], request: &Message) -> Flow {
        let handler = RequestType::from_msg_type(request.msg_type())
            .and_then(|kind| self.handlers.get(&kind).copied());
        let Some(handler) = handler else {
            let err = KernelError::UnknownMessageType(request.msg_type().to_string());
            tracing::warn!(error = %err, msg_id = %request.msg_id(), "ignoring request");
            return Flow::Continue;
        };

        tracing::debug!(msg_type = request.msg_type(), msg_id = %request.msg_id(), "dispatching request");
        handler(self, identities, request)
    }
}

impl<T: Transport> std::fmt::Debug for Kernel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("state", &self.state)
            .field("execution_count", &self.execution_count)
            .field("history", &self.history.len())
            .field("recorded_ports", &self.recorded_ports)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_api::{ManualClock, MemoryTransport};
    use serde_json::json;

    fn kernel() -> (Kernel<MemoryTransport>, MemoryTransport) {
        let transport = MemoryTransport::new();
        let kernel = Kernel::with_config(
            transport.clone(),
            Session::new("kernel"),
            KernelConfig::default(),
            Rc::new(ManualClock::new()),
        );
        (kernel, transport)
    }

    #[test]
    fn test_request_type_names() {
        for request in RequestType::ALL {
            let name = request.msg_type().as_str();
            assert!(name.ends_with("_request"));
            assert_eq!(RequestType::from_msg_type(name), Some(request));
        }
        assert_eq!(RequestType::from_msg_type("execute_reply"), None);
    }

    #[test]
    fn test_every_request_type_has_a_handler() {
        let (kernel, _) = kernel();
        for request in RequestType::ALL {
            assert!(kernel.handles(request.msg_type().as_str()));
        }
        assert!(!kernel.handles("history_request"));
    }

    #[test]
    fn test_state_transitions() {
        let mut state = KernelState::Idle;
        state.transition(KernelState::Busy);
        assert_eq!(state, KernelState::Busy);
        state.transition(KernelState::Busy);
        assert_eq!(state, KernelState::Busy);
    }

    #[test]
    fn test_record_ports() {
        let (mut kernel, _) = kernel();
        assert_eq!(kernel.recorded_ports(), None);
        kernel.record_ports(KernelPorts::new(1, 2, 3, 4));
        assert_eq!(kernel.recorded_ports(), Some(KernelPorts::new(1, 2, 3, 4)));
    }

    #[test]
    fn test_undecodable_frames_are_skipped() {
        let (mut kernel, transport) = kernel();
        transport
            .push_inbound(Channel::Shell, vec![b"garbage".to_vec()])
            .unwrap();
        assert_eq!(kernel.poll_once(RecvMode::NonBlocking).unwrap(), Some(Flow::Continue));
        assert_eq!(kernel.poll_once(RecvMode::NonBlocking).unwrap(), None);
    }

    #[test]
    fn test_unknown_message_type_is_ignored() {
        let (mut kernel, transport) = kernel();
        let mut client = Session::new("client");
        let request = client.msg("history_request", json!({}), None);
        transport
            .inject(&client, Channel::Shell, &request, &[Identity::from("c")])
            .unwrap();

        assert_eq!(kernel.run_pending().unwrap(), Flow::Continue);
        assert!(transport.take_outbound(Channel::Shell).is_empty());
        assert_eq!(kernel.state(), KernelState::Idle);
    }

    #[test]
    fn test_start_returns_error_when_disconnected() {
        let (mut kernel, _) = kernel();
        let err = kernel.start().unwrap_err();
        assert!(err.is_disconnect());
    }
}
