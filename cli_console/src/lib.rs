//! # CLI Console
//!
//! A terminal frontend for the interactive kernel.
//!
//! It is NOT a terminal emulator and NOT a notebook: one line in, rendered
//! kernel output back.
//!
//! ## Layers
//!
//! - [`KernelClient`]: request/reply over any [`kernel_api::Transport`],
//!   input answered through a callback, iopub output attributed per request
//! - [`ConsoleCommand`]: what a typed line means
//! - [`InteractiveConsole`]: runs lines and renders `Out[n]:`, streams and
//!   tracebacks as text
//!
//! The `kernel-console` binary connects these to a socket transport and the
//! terminal.

pub mod client;
pub mod commands;
pub mod interactive;

pub use client::{ClientConfig, ClientError, InputHandler, KernelClient, Reply};
pub use commands::ConsoleCommand;
pub use interactive::{InteractiveConsole, Response};
