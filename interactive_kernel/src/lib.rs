//! # Interactive Kernel
//!
//! A message-driven kernel that runs code for remote frontends.
//!
//! ## Architecture
//!
//! The kernel reads requests from the shell channel of a
//! [`Transport`](kernel_api::Transport), looks up a handler by message type
//! and lets the handler reply. Everything user code prints is buffered in
//! an [`OutStream`] and published on iopub, tagged with the request that
//! produced it. When running code asks for input, the kernel sends an
//! `input_request` on the stdin channel and blocks until the frontend
//! answers.
//!
//! ## Philosophy
//!
//! **The kernel is the context.**
//!
//! There are no process-wide hooks. The namespace, the output streams and
//! the display hook live on the [`Kernel`] and are lent to the interpreter
//! through an explicit host for the duration of one execution. Time comes
//! from a [`Clock`](kernel_api::Clock), so the whole kernel runs
//! deterministically against an in-memory transport in tests.
//!
//! ## Example
//!
//! ```
//! use interactive_kernel::test_utils::{msg_types, KernelHarness};
//!
//! let mut harness = KernelHarness::new();
//! harness.execute("x = 6 * 7\nx").unwrap();
//!
//! let iopub = harness.iopub().unwrap();
//! assert_eq!(msg_types(&iopub), vec!["pyin", "pyout"]);
//! assert_eq!(iopub[1].content["data"]["text/plain"], "42");
//! ```

pub mod config;
pub mod connection;
pub mod display;
mod handlers;
pub mod host;
pub mod kernel;
pub mod outstream;
pub mod test_utils;

pub use config::KernelConfig;
pub use connection::{Connection, Publisher};
pub use display::{DisplayHook, Formatter, MimeBundle, PlainTextFormatter};
pub use host::ExecutionHost;
pub use kernel::{Flow, Handler, Kernel, KernelState, RequestType};
pub use outstream::OutStream;
