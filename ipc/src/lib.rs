//! # Inter-Process Communication (IPC)
//!
//! This crate defines the kernel protocol's message model and the session
//! that frames messages into multipart wire frames.
//!
//! ## Architecture
//!
//! Every message carries:
//! - A header (message id, type, session, username, counter)
//! - A parent header (the header of the request that caused it, or empty)
//! - A content mapping whose shape depends on the message type
//!
//! On the wire a message is a list of frames:
//!
//! ```text
//! [identity..., "<IDS|MSG>", signature, header, parent_header, content]
//! ```
//!
//! The identity prefix routes replies on request/reply channels. The
//! signature is empty unless the session was created with a key.

pub mod message;
pub mod session;
pub mod typed;

pub use message::{Header, Message, MsgType};
pub use session::{extract_header, Frames, Session, SessionError, DELIMITER};
pub use typed::{
    CompleteReply, CompleteRequest, ErrorContent, ExecuteReply, ExecuteRequest, InputReply,
    InputRequest, ObjectInfoReply, ObjectInfoRequest, PyinContent, PyoutContent, StreamContent,
};
