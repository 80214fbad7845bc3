//! # Output Streams
//!
//! [`OutStream`] collects text written by running code and publishes it as
//! `stream` messages on iopub.
//!
//! ## Flushing
//!
//! The first write after a flush opens a window. A later write that lands
//! more than `flush_interval` after the window opened flushes the buffer,
//! its own text included. Anything still buffered is flushed explicitly by
//! the kernel before it replies.
//!
//! Every published chunk carries the header of the request that was active
//! when it was flushed, so frontends can attribute output to the cell that
//! produced it.

use crate::connection::Publisher;
use ipc::{Header, Message, MsgType, StreamContent};
use kernel_api::{Clock, Duration, Instant, KernelError};
use std::rc::Rc;

/// Buffered, request-tagged, write-only output sink
pub struct OutStream {
    name: String,
    parent_header: Option<Header>,
    buffer: String,
    flush_interval: Duration,
    start: Option<Instant>,
    closed: bool,
    clock: Rc<dyn Clock>,
}

impl OutStream {
    /// Creates an open, empty stream
    pub fn new(name: impl Into<String>, flush_interval: Duration, clock: Rc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            parent_header: None,
            buffer: String::new(),
            flush_interval,
            start: None,
            closed: false,
            clock,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Header attached to published chunks
    pub fn parent_header(&self) -> Option<&Header> {
        self.parent_header.as_ref()
    }

    /// Text written but not yet published
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Tags future output with the header of `request`
    pub fn set_parent(&mut self, request: &Message) {
        self.parent_header = Some(ipc::extract_header(request));
    }

    /// Appends text, flushing when the window has expired
    pub fn write(&mut self, publisher: &mut dyn Publisher, text: &str) -> Result<(), KernelError> {
        self.ensure_open()?;
        self.buffer.push_str(text);

        let now = self.clock.now();
        match self.start {
            None => self.start = Some(now),
            Some(start) if now.duration_since(start) > self.flush_interval => {
                self.flush(publisher)?;
            }
            Some(_) => {}
        }
        Ok(())
    }

    /// Writes each item in order
    pub fn write_lines<I, S>(&mut self, publisher: &mut dyn Publisher, lines: I) -> Result<(), KernelError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.write(publisher, line.as_ref())?;
        }
        Ok(())
    }

    /// Publishes buffered text as one `stream` message
    pub fn flush(&mut self, publisher: &mut dyn Publisher) -> Result<(), KernelError> {
        self.ensure_open()?;
        if self.buffer.is_empty() {
            return Ok(());
        }

        let content = StreamContent {
            name: self.name.clone(),
            data: std::mem::take(&mut self.buffer),
        };
        self.start = None;
        tracing::trace!(stream = %self.name, bytes = content.data.len(), "flushing stream");
        publisher.publish(
            MsgType::Stream,
            serde_json::to_value(content)?,
            self.parent_header.as_ref(),
        )
    }

    /// Stops accepting writes
    ///
    /// Text still buffered is dropped; flush first to keep it.
    pub fn close(&mut self) {
        self.closed = true;
        self.buffer.clear();
        self.start = None;
    }

    /// Streams are write-only
    pub fn read(&self) -> Result<String, KernelError> {
        Err(KernelError::UnsupportedOperation("read"))
    }

    /// Streams are write-only
    pub fn read_line(&self) -> Result<String, KernelError> {
        Err(KernelError::UnsupportedOperation("readline"))
    }

    fn ensure_open(&self) -> Result<(), KernelError> {
        if self.closed {
            Err(KernelError::StreamClosed(self.name.clone()))
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for OutStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutStream")
            .field("name", &self.name)
            .field("buffered", &self.buffer.len())
            .field("closed", &self.closed)
            .finish()
    }
}
