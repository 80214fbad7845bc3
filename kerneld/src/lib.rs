//! # Kernel Daemon
//!
//! This crate hosts an interactive kernel behind TCP sockets.
//!
//! ## Philosophy
//!
//! - **The daemon owns I/O**: the kernel only sees a transport
//! - **Ports are explicit**: requested on the command line or picked free,
//!   then reported back
//! - **Lifetime is explicit**: a launched kernel either watches its parent
//!   or runs independently
//!
//! ## Responsibilities
//!
//! The daemon:
//! - Binds shell, iopub, stdin and heartbeat
//! - Records the bound ports on the kernel for `connect_request`
//! - Writes a connection file for frontends
//! - Exits when its parent process does
//!
//! [`launch_kernel`] starts a daemon as a child process.

pub mod config;
pub mod connection_file;
pub mod error;
pub mod launcher;
pub mod poller;
pub mod runtime;

pub use config::{parse_args, print_usage, Command, KerneldConfig};
pub use connection_file::ConnectionInfo;
pub use error::{KerneldError, LaunchError};
pub use launcher::{launch_kernel, LaunchConfig, LaunchedKernel};
pub use poller::ParentPoller;
pub use runtime::{init_logging, KernelDaemon};
