//! Typed message contents.
//!
//! Each struct mirrors the content mapping of one message type. Handlers
//! decode requests with [`Message::content_as`](crate::Message::content_as)
//! and encode replies with `serde_json::to_value`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Content of `execute_request`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecuteRequest {
    /// Source code to run.
    pub code: String,
}

impl ExecuteRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// Error fields shared by `pyerr` and failed `execute_reply` messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorContent {
    /// Exception type name, e.g. `ZeroDivisionError`.
    pub ename: String,
    /// Exception message.
    pub evalue: String,
    /// Formatted traceback, one entry per chunk.
    pub traceback: Vec<String>,
}

/// Content of `execute_reply`, tagged by `status`.
///
/// `Error` doubles as the content of `pyerr`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecuteReply {
    Ok {
        #[serde(default)]
        payload: Map<String, Value>,
    },
    Error(ErrorContent),
    Aborted,
}

impl ExecuteReply {
    /// Successful reply with an empty payload.
    pub fn ok() -> Self {
        ExecuteReply::Ok {
            payload: Map::new(),
        }
    }

    /// Returns the status string carried on the wire.
    pub fn status(&self) -> &'static str {
        match self {
            ExecuteReply::Ok { .. } => "ok",
            ExecuteReply::Error(_) => "error",
            ExecuteReply::Aborted => "aborted",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ExecuteReply::Error(_))
    }
}

/// Content of `pyin`: the code about to run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PyinContent {
    pub code: String,
    #[serde(default)]
    pub execution_count: u64,
}

/// Content of `pyout`: a formatted result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PyoutContent {
    /// MIME type to representation.
    pub data: Map<String, Value>,
    pub execution_count: u64,
}

/// Content of `stream`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamContent {
    /// Stream name, `stdout` or `stderr`.
    pub name: String,
    /// Buffered text.
    pub data: String,
}

/// Content of `complete_request`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompleteRequest {
    /// Full line the cursor is on.
    #[serde(default)]
    pub line: String,
    /// Token being completed.
    #[serde(default)]
    pub text: String,
}

/// Content of `complete_reply`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompleteReply {
    pub matches: Vec<String>,
    pub status: String,
}

impl CompleteReply {
    pub fn ok(matches: Vec<String>) -> Self {
        Self {
            matches,
            status: "ok".to_string(),
        }
    }
}

/// Content of `object_info_request`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectInfoRequest {
    /// Dotted name to inspect, e.g. `math.sqrt`.
    pub oname: String,
}

/// Content of `object_info_reply`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectInfoReply {
    pub docstring: String,
}

/// Content of `input_request`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputRequest {
    pub prompt: String,
}

/// Content of `input_reply`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputReply {
    pub value: String,
}
