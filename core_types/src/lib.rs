//! # Core Types
//!
//! Fundamental identifiers shared by every crate in the kernel workspace.
//!
//! ## Key Types
//!
//! - [`SessionId`]: Identifies one messaging session (a kernel or a frontend)
//! - [`MessageId`]: Identifies a single message header
//! - [`Identity`]: Routing envelope frame used on request/reply channels

pub mod ids;

pub use ids::{Identity, MessageId, SessionId};
