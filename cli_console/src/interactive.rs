//! Interactive console
//!
//! Runs console lines against a kernel and renders what came back as
//! terminal text. The console never prints; the binary decides where the
//! rendered text goes.

use crate::client::{ClientError, KernelClient, Reply};
use crate::commands::ConsoleCommand;
use ipc::MsgType;
use kernel_api::Transport;

/// Rendered result of one console line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Text to show, already newline-terminated
    pub text: String,
    /// Whether the console should stop
    pub exit: bool,
}

/// Line-oriented console over a kernel client
pub struct InteractiveConsole<T: Transport> {
    client: KernelClient<T>,
    /// Execution count of the last request that ran code
    execution_count: u64,
}

impl<T: Transport> InteractiveConsole<T> {
    pub fn new(client: KernelClient<T>) -> Self {
        Self {
            client,
            execution_count: 0,
        }
    }

    pub fn client_mut(&mut self) -> &mut KernelClient<T> {
        &mut self.client
    }

    /// Prompt for the next line, e.g. `In [3]: `
    pub fn prompt(&self) -> String {
        format!("In [{}]: ", self.execution_count + 1)
    }

    /// Runs one console line
    pub fn handle_line(&mut self, line: &str) -> Result<Response, ClientError> {
        match ConsoleCommand::parse(line) {
            ConsoleCommand::Empty => Ok(Response::default()),
            ConsoleCommand::Execute(code) => {
                let reply = self.client.execute(&code)?;
                Ok(Response {
                    text: self.render_execution(&reply),
                    exit: false,
                })
            }
            ConsoleCommand::Inspect(name) => {
                let docstring = self.client.object_info(&name)?;
                let text = if docstring.is_empty() {
                    format!("Object `{}` not found.\n", name)
                } else {
                    terminated(docstring)
                };
                Ok(Response { text, exit: false })
            }
            ConsoleCommand::Complete(text) => {
                let matches = self.client.complete(&text, &text)?;
                let text = if matches.is_empty() {
                    "(no matches)\n".to_string()
                } else {
                    terminated(matches.join("\n"))
                };
                Ok(Response { text, exit: false })
            }
            ConsoleCommand::Exit => {
                self.client.shutdown(false)?;
                Ok(Response {
                    text: String::new(),
                    exit: true,
                })
            }
        }
    }

    fn render_execution(&mut self, reply: &Reply) -> String {
        let mut text = String::new();
        for output in &reply.outputs {
            match output.msg_type() {
                t if t == MsgType::Pyin.as_str() => {
                    if let Some(count) = output.content["execution_count"].as_u64() {
                        self.execution_count = count;
                    }
                }
                t if t == MsgType::Stream.as_str() => {
                    text.push_str(output.content_str("data").unwrap_or_default());
                }
                t if t == MsgType::Pyout.as_str() => {
                    let count = output.content["execution_count"].as_u64().unwrap_or(self.execution_count);
                    let value = output.content["data"]["text/plain"].as_str().unwrap_or_default();
                    text.push_str(&format!("Out[{}]: {}\n", count, value));
                }
                _ => {}
            }
        }

        // pyerr repeats the reply's traceback; only the reply is rendered
        if let Some(error) = reply.error() {
            for chunk in &error.traceback {
                text.push_str(&terminated(chunk.clone()));
            }
        }
        if reply.status() == Some("aborted") {
            text.push_str("Aborted\n");
        }
        text
    }
}

impl<T: Transport> std::fmt::Debug for InteractiveConsole<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractiveConsole")
            .field("execution_count", &self.execution_count)
            .finish_non_exhaustive()
    }
}

fn terminated(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
