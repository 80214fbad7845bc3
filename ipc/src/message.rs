//! Message types and header structure

use core_types::{MessageId, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Message types spoken by the kernel protocol
///
/// The wire carries the type as a plain string in the header. Types this
/// crate does not know about still travel as strings; see
/// [`MsgType::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgType {
    ExecuteRequest,
    ExecuteReply,
    Pyin,
    Pyout,
    Pyerr,
    Stream,
    CompleteRequest,
    CompleteReply,
    ObjectInfoRequest,
    ObjectInfoReply,
    ConnectRequest,
    ConnectReply,
    InputRequest,
    InputReply,
    ShutdownRequest,
    ShutdownReply,
}

impl MsgType {
    /// Returns the wire name of this message type
    pub const fn as_str(&self) -> &'static str {
        match self {
            MsgType::ExecuteRequest => "execute_request",
            MsgType::ExecuteReply => "execute_reply",
            MsgType::Pyin => "pyin",
            MsgType::Pyout => "pyout",
            MsgType::Pyerr => "pyerr",
            MsgType::Stream => "stream",
            MsgType::CompleteRequest => "complete_request",
            MsgType::CompleteReply => "complete_reply",
            MsgType::ObjectInfoRequest => "object_info_request",
            MsgType::ObjectInfoReply => "object_info_reply",
            MsgType::ConnectRequest => "connect_request",
            MsgType::ConnectReply => "connect_reply",
            MsgType::InputRequest => "input_request",
            MsgType::InputReply => "input_reply",
            MsgType::ShutdownRequest => "shutdown_request",
            MsgType::ShutdownReply => "shutdown_reply",
        }
    }

    /// Parses a wire name, returning `None` for unknown types
    pub fn parse(name: &str) -> Option<Self> {
        let parsed = match name {
            "execute_request" => MsgType::ExecuteRequest,
            "execute_reply" => MsgType::ExecuteReply,
            "pyin" => MsgType::Pyin,
            "pyout" => MsgType::Pyout,
            "pyerr" => MsgType::Pyerr,
            "stream" => MsgType::Stream,
            "complete_request" => MsgType::CompleteRequest,
            "complete_reply" => MsgType::CompleteReply,
            "object_info_request" => MsgType::ObjectInfoRequest,
            "object_info_reply" => MsgType::ObjectInfoReply,
            "connect_request" => MsgType::ConnectRequest,
            "connect_reply" => MsgType::ConnectReply,
            "input_request" => MsgType::InputRequest,
            "input_reply" => MsgType::InputReply,
            "shutdown_request" => MsgType::ShutdownRequest,
            "shutdown_reply" => MsgType::ShutdownReply,
            _ => return None,
        };
        Some(parsed)
    }

    /// Derives the reply type name for a request type name
    ///
    /// `execute_request` becomes `execute_reply`. Names without the
    /// `_request` suffix get `_reply` appended.
    pub fn reply_name_for(request: &str) -> String {
        match request.strip_suffix("_request") {
            Some(prefix) => format!("{}_reply", prefix),
            None => format!("{}_reply", request),
        }
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<MsgType> for String {
    fn from(value: MsgType) -> Self {
        value.as_str().to_string()
    }
}

/// Message header
///
/// Headers are immutable once built. A copy of the request header becomes
/// the parent header of every message the request causes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Unique identifier for this message
    pub msg_id: MessageId,
    /// Wire name of the message type
    pub msg_type: String,
    /// Session that produced the message
    pub session: SessionId,
    /// User name of the producing session
    #[serde(default)]
    pub username: String,
    /// Per-session message counter
    #[serde(default)]
    pub counter: u64,
}

/// A complete protocol message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Header of this message
    pub header: Header,
    /// Header of the request that caused this message, if any
    #[serde(with = "parent_header", default)]
    pub parent_header: Option<Header>,
    /// Type-specific content
    pub content: Value,
}

impl Message {
    /// Returns the wire name of the message type
    pub fn msg_type(&self) -> &str {
        &self.header.msg_type
    }

    /// Returns the id of this message
    pub fn msg_id(&self) -> MessageId {
        self.header.msg_id
    }

    /// Returns the parent message id, if this message has a parent
    pub fn parent_id(&self) -> Option<MessageId> {
        self.parent_header.as_ref().map(|header| header.msg_id)
    }

    /// Deserializes the content into a typed structure
    pub fn content_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.content.clone())
    }

    /// Looks up a single string field of the content
    pub fn content_str(&self, key: &str) -> Option<&str> {
        self.content.get(key).and_then(Value::as_str)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] content={}",
            self.header.msg_type, self.header.msg_id, self.content
        )
    }
}

/// Serde adapter for parent headers
///
/// An absent parent travels as an empty JSON object, matching the wire
/// format frontends expect.
pub(crate) mod parent_header {
    use super::Header;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::{Map, Value};

    pub fn serialize<S: Serializer>(parent: &Option<Header>, s: S) -> Result<S::Ok, S::Error> {
        match parent {
            Some(header) => header.serialize(s),
            None => Map::new().serialize(s),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Header>, D::Error> {
        let value = Value::deserialize(d)?;
        from_value(value).map_err(D::Error::custom)
    }

    pub fn from_value(value: Value) -> Result<Option<Header>, serde_json::Error> {
        match &value {
            Value::Null => Ok(None),
            Value::Object(map) if map.is_empty() => Ok(None),
            _ => serde_json::from_value(value).map(Some),
        }
    }

    pub fn to_value(parent: &Option<Header>) -> Result<Value, serde_json::Error> {
        match parent {
            Some(header) => serde_json::to_value(header),
            None => Ok(Value::Object(Map::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header(msg_type: &str) -> Header {
        Header {
            msg_id: MessageId::new(),
            msg_type: msg_type.to_string(),
            session: SessionId::new(),
            username: "kernel".to_string(),
            counter: 0,
        }
    }

    #[test]
    fn test_msg_type_names_roundtrip() {
        let all = [
            MsgType::ExecuteRequest,
            MsgType::ExecuteReply,
            MsgType::Pyin,
            MsgType::Pyout,
            MsgType::Pyerr,
            MsgType::Stream,
            MsgType::CompleteRequest,
            MsgType::CompleteReply,
            MsgType::ObjectInfoRequest,
            MsgType::ObjectInfoReply,
            MsgType::ConnectRequest,
            MsgType::ConnectReply,
            MsgType::InputRequest,
            MsgType::InputReply,
            MsgType::ShutdownRequest,
            MsgType::ShutdownReply,
        ];
        for msg_type in all {
            assert_eq!(MsgType::parse(msg_type.as_str()), Some(msg_type));
        }
        assert_eq!(MsgType::parse("history_request"), None);
    }

    #[test]
    fn test_reply_name_for_request() {
        assert_eq!(MsgType::reply_name_for("execute_request"), "execute_reply");
        assert_eq!(
            MsgType::reply_name_for("object_info_request"),
            "object_info_reply"
        );
        assert_eq!(MsgType::reply_name_for("ping"), "ping_reply");
    }

    #[test]
    fn test_missing_parent_serializes_as_empty_object() {
        let message = Message {
            header: header("pyin"),
            parent_header: None,
            content: json!({"code": "1"}),
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["parent_header"], json!({}));

        let back: Message = serde_json::from_value(value).unwrap();
        assert!(back.parent_header.is_none());
    }

    #[test]
    fn test_parent_header_survives_serialization() {
        let parent = header("execute_request");
        let message = Message {
            header: header("stream"),
            parent_header: Some(parent.clone()),
            content: json!({"name": "stdout", "data": "hi"}),
        };

        let text = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&text).unwrap();
        assert_eq!(back.parent_header, Some(parent));
        assert_eq!(back.parent_id(), message.parent_id());
    }

    #[test]
    fn test_content_accessors() {
        let message = Message {
            header: header("execute_request"),
            parent_header: None,
            content: json!({"code": "x = 1"}),
        };
        assert_eq!(message.content_str("code"), Some("x = 1"));
        assert_eq!(message.content_str("missing"), None);
        assert_eq!(message.msg_type(), "execute_request");
    }
}
