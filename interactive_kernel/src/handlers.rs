//! # Request Handlers
//!
//! One method per request type, registered in the kernel's dispatch table.
//!
//! ## Error handling
//!
//! Handlers never fail the main loop. Malformed requests are logged and
//! dropped without a reply. Errors raised by user code are reported to the
//! requester. A failure to send a reply is logged and the loop carries on.

use crate::host::ExecutionHost;
use crate::kernel::{Flow, Kernel, KernelState};
use core_types::Identity;
use ipc::{
    CompleteReply, CompleteRequest, ErrorContent, ExecuteReply, ExecuteRequest, Header, Message,
    MsgType, ObjectInfoReply, PyinContent,
};
use kernel_api::{Channel, KernelError, RecvMode, Transport};
use script_engine::{Program, RuntimeError, Value};
use serde::Serialize;
use serde_json::json;

/// How an execution ended
enum Outcome {
    Ok,
    /// The code never ran
    CompileError(ErrorContent),
    /// The code raised; queued requests get aborted
    RuntimeError(ErrorContent),
}

impl<T: Transport> Kernel<T> {
    /// Runs the code of an `execute_request`
    pub(crate) fn execute_request(&mut self, identities: &[Identity], request: &Message) -> Flow {
        let code = match request.content_as::<ExecuteRequest>() {
            Ok(content) => content.code,
            Err(err) => {
                let err = KernelError::malformed(request.msg_type(), err.to_string());
                tracing::error!(error = %err, msg_id = %request.msg_id(), "dropping request");
                return Flow::Continue;
            }
        };

        self.state.transition(KernelState::Busy);
        self.execution_count += 1;
        let parent = ipc::extract_header(request);
        self.stdout.set_parent(request);
        self.stderr.set_parent(request);
        self.display_hook.set_parent(request);

        let pyin = PyinContent {
            code: code.clone(),
            execution_count: self.execution_count,
        };
        self.publish(MsgType::Pyin, &pyin, &parent);
        self.history.push(code.clone());

        let outcome = match self.interpreter.compile(&code) {
            Ok(program) => match self.run_program(&program, identities, &parent) {
                Ok(Some(value)) => {
                    self.display_result(&value);
                    Outcome::Ok
                }
                Ok(None) => Outcome::Ok,
                Err(err) => Outcome::RuntimeError(runtime_error_content(&err)),
            },
            Err(err) => {
                tracing::debug!(ename = err.ename(), line = err.line, "compile failed");
                Outcome::CompileError(ErrorContent {
                    ename: err.ename().to_string(),
                    evalue: err.message.clone(),
                    traceback: err.traceback(&code),
                })
            }
        };

        let reply = match &outcome {
            Outcome::Ok => ExecuteReply::ok(),
            Outcome::CompileError(content) | Outcome::RuntimeError(content) => {
                ExecuteReply::Error(content.clone())
            }
        };
        if reply.is_error() {
            self.publish(MsgType::Pyerr, &reply, &parent);
        }

        self.flush_streams();
        self.send_reply(identities, request, &reply);

        if let Outcome::RuntimeError(_) = outcome {
            self.state.transition(KernelState::Aborting);
            self.abort_queue();
        }
        self.state.transition(KernelState::Idle);
        Flow::Continue
    }

    fn run_program(
        &mut self,
        program: &Program,
        identities: &[Identity],
        parent: &Header,
    ) -> Result<Option<Value>, RuntimeError> {
        let mut host = ExecutionHost {
            connection: &mut self.connection,
            stdout: &mut self.stdout,
            stderr: &mut self.stderr,
            state: &mut self.state,
            parent,
            identities,
        };
        self.interpreter
            .execute(program, &mut self.user_ns, &mut host)
    }

    fn display_result(&mut self, value: &Value) {
        if let Err(err) = self
            .display_hook
            .publish(&mut self.connection, value, self.execution_count)
        {
            tracing::error!(error = %err, "failed to publish result");
        }
    }

    /// Replies with completion candidates
    pub(crate) fn complete_request(&mut self, identities: &[Identity], request: &Message) -> Flow {
        let content = request
            .content_as::<CompleteRequest>()
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "complete_request content unreadable, completing nothing");
                CompleteRequest::default()
            });
        let matches = self
            .interpreter
            .complete(&self.user_ns, &content.line, &content.text);
        self.send_reply(identities, request, &CompleteReply::ok(matches));
        Flow::Continue
    }

    /// Replies with the docstring of a dotted name
    pub(crate) fn object_info_request(
        &mut self,
        identities: &[Identity],
        request: &Message,
    ) -> Flow {
        let docstring = match request.content_str("oname") {
            Some(oname) if !oname.is_empty() => self.interpreter.object_doc(&self.user_ns, oname),
            _ => String::new(),
        };
        self.send_reply(identities, request, &ObjectInfoReply { docstring });
        Flow::Continue
    }

    /// Replies with the recorded port map
    pub(crate) fn connect_request(&mut self, identities: &[Identity], request: &Message) -> Flow {
        let content = match self.recorded_ports {
            Some(ports) => json!(ports),
            None => json!({}),
        };
        self.send_reply(identities, request, &content);
        Flow::Continue
    }

    /// Echoes the request on shell and iopub, then ends the loop
    pub(crate) fn shutdown_request(&mut self, identities: &[Identity], request: &Message) -> Flow {
        tracing::info!(msg_id = %request.msg_id(), "shutdown requested");
        self.send_reply(identities, request, &request.content);
        let parent = ipc::extract_header(request);
        self.publish(MsgType::ShutdownReply, &request.content, &parent);

        self.flush_streams();
        self.stdout.close();
        self.stderr.close();

        self.clock.sleep(self.config.shutdown_grace);
        Flow::Shutdown
    }

    /// Replies `aborted` to every request already queued on shell
    ///
    /// Returns how many requests were aborted.
    pub(crate) fn abort_queue(&mut self) -> usize {
        let mut aborted = 0;
        loop {
            let (identities, request) =
                match self.connection.recv(Channel::Shell, RecvMode::NonBlocking) {
                    Ok(Some(received)) => received,
                    Ok(None) => break,
                    Err(KernelError::Session(err)) => {
                        tracing::warn!(error = %err, "dropping undecodable request while aborting");
                        continue;
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "abort drain stopped");
                        break;
                    }
                };

            tracing::info!(msg_type = request.msg_type(), msg_id = %request.msg_id(), "aborting request");
            self.send_reply(&identities, &request, &ExecuteReply::Aborted);
            aborted += 1;
            self.clock.sleep(self.config.abort_poll_interval);
        }
        if aborted > 0 {
            tracing::debug!(aborted, "abort queue drained");
        }
        aborted
    }

    /// Flushes stderr then stdout
    fn flush_streams(&mut self) {
        for stream in [&mut self.stderr, &mut self.stdout] {
            if let Err(err) = stream.flush(&mut self.connection) {
                tracing::error!(stream = stream.name(), error = %err, "flush failed");
            }
        }
    }

    /// Sends `<prefix>_reply` for a `<prefix>_request` on the shell channel
    fn send_reply<C: Serialize>(&mut self, identities: &[Identity], request: &Message, content: &C) {
        let msg_type = MsgType::reply_name_for(request.msg_type());
        let result = serde_json::to_value(content)
            .map_err(KernelError::from)
            .and_then(|content| {
                self.connection.send(
                    Channel::Shell,
                    identities,
                    msg_type.as_str(),
                    content,
                    Some(&request.header),
                )
            });
        if let Err(err) = result {
            tracing::error!(%msg_type, error = %err, "failed to send reply");
        }
    }

    fn publish<C: Serialize>(&mut self, msg_type: MsgType, content: &C, parent: &Header) {
        let result = serde_json::to_value(content)
            .map_err(KernelError::from)
            .and_then(|content| {
                self.connection
                    .send(Channel::IoPub, &[], msg_type, content, Some(parent))
            });
        if let Err(err) = result {
            tracing::error!(%msg_type, error = %err, "failed to publish");
        }
    }
}

fn runtime_error_content(err: &RuntimeError) -> ErrorContent {
    ErrorContent {
        ename: err.ename().to_string(),
        evalue: err.evalue().to_string(),
        traceback: err.traceback(),
    }
}
