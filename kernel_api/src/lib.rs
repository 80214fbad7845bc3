//! # Kernel API
//!
//! This crate defines the seam between the kernel and the outside world.
//!
//! ## Philosophy
//!
//! The kernel provides **mechanisms**, not transports:
//! - Multipart frames move over named channels
//! - Messages are framed by an explicit [`ipc::Session`]
//! - Time is read through a [`Clock`], never ambient
//!
//! ## Design Goals
//!
//! 1. **Testability**: every transport and clock can be swapped for an
//!    in-memory double
//! 2. **Explicitness**: blocking and non-blocking receives are distinct calls
//! 3. **Simplicity**: a transport is two methods
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - A socket library (see `tcp_transport`)
//! - A message broker (channels carry frames, nothing more)

pub mod error;
pub mod memory;
pub mod ports;
pub mod time;
pub mod transport;

pub use error::{KernelError, TransportError};
pub use memory::{FrameQueue, MemoryTransport};
pub use ports::KernelPorts;
pub use time::{Clock, Duration, Instant, ManualClock, SystemClock};
pub use transport::{Channel, RecvMode, Transport, TransportExt};
