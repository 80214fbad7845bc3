//! Host capability
//!
//! Running code never touches process-wide stdout, stderr or stdin. Output
//! and input go through a [`Host`] handed to the interpreter for the
//! duration of one execution.

use std::collections::VecDeque;
use thiserror::Error;

/// Output stream addressed by a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamName {
    Stdout,
    Stderr,
}

impl StreamName {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StreamName::Stdout => "stdout",
            StreamName::Stderr => "stderr",
        }
    }
}

/// Host side failures surfaced to running code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The stream no longer accepts writes
    #[error("I/O operation on closed file")]
    Closed,

    /// No input is available
    #[error("EOF when reading a line")]
    Eof,

    #[error("{0}")]
    Other(String),
}

/// Services the interpreter needs from its embedder
pub trait Host {
    /// Writes text to an output stream
    fn write(&mut self, stream: StreamName, text: &str) -> Result<(), HostError>;

    /// Pushes buffered output out
    fn flush(&mut self, _stream: StreamName) -> Result<(), HostError> {
        Ok(())
    }

    /// Reads one line of input after showing `prompt`
    ///
    /// The returned line has no trailing newline.
    fn read_line(&mut self, prompt: &str) -> Result<String, HostError>;
}

/// Host that records output in memory and replays scripted input
#[derive(Debug, Default)]
pub struct CaptureHost {
    pub stdout: String,
    pub stderr: String,
    /// Prompts passed to `read_line`, in order
    pub prompts: Vec<String>,
    inputs: VecDeque<String>,
}

impl CaptureHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues lines returned by later `read_line` calls
    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(inputs.into_iter().map(Into::into));
        self
    }
}

impl Host for CaptureHost {
    fn write(&mut self, stream: StreamName, text: &str) -> Result<(), HostError> {
        match stream {
            StreamName::Stdout => self.stdout.push_str(text),
            StreamName::Stderr => self.stderr.push_str(text),
        }
        Ok(())
    }

    fn read_line(&mut self, prompt: &str) -> Result<String, HostError> {
        self.prompts.push(prompt.to_string());
        self.inputs.pop_front().ok_or(HostError::Eof)
    }
}
