//! # TCP Transport
//!
//! Carries kernel protocol frames over plain TCP sockets.
//!
//! ## Architecture
//!
//! - [`TcpKernelTransport`]: one listener per channel on the kernel side
//! - [`TcpClientTransport`]: the matching frontend connections
//! - [`Heartbeat`]: a byte echo on its own port
//!
//! Frame lists are encoded by [`codec`]. Socket reads happen on transport
//! threads that only move bytes into queues; the kernel itself stays
//! single-threaded and sees nothing but the [`Transport`](kernel_api::Transport)
//! trait. Writes carry a timeout ([`SocketOptions`]), and a peer that stops
//! reading is dropped rather than stalling the kernel.

pub mod client;
pub mod codec;
pub mod heartbeat;
pub mod server;

pub use client::TcpClientTransport;
pub use codec::{read_frames, write_frames};
pub use heartbeat::{ping, Heartbeat};
pub use server::{SocketOptions, TcpKernelTransport, KERNEL_CHANNELS};
