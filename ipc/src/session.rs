//! Session: builds headers and frames messages for the wire.

use crate::message::{parent_header, Header, Message};
use core_types::{Identity, MessageId, SessionId};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Separates routing identities from the message body.
pub const DELIMITER: &[u8] = b"<IDS|MSG>";

/// A multipart wire message.
pub type Frames = Vec<Vec<u8>>;

/// Number of body frames following the delimiter.
const BODY_FRAMES: usize = 4;

/// Session framing errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Frame list has no <IDS|MSG> delimiter")]
    MissingDelimiter,

    #[error("Message is missing its {0} frame")]
    MissingPart(&'static str),

    #[error("Message signature does not match")]
    InvalidSignature,

    #[error("Signing key rejected")]
    InvalidKey,

    #[error("Malformed JSON in message: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A messaging session
///
/// Owns the session id stamped into every header, the message counter and
/// the optional signing key.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    username: String,
    key: Option<Vec<u8>>,
    counter: u64,
}

impl Session {
    /// Creates an unsigned session with a random id
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: SessionId::new(),
            username: username.into(),
            key: None,
            counter: 0,
        }
    }

    /// Enables message signing with the given key
    ///
    /// An empty key disables signing.
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        let key = key.into();
        self.key = if key.is_empty() { None } else { Some(key) };
        self
    }

    /// Returns the session id
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the user name stamped into headers
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns whether outgoing messages are signed
    pub fn is_signed(&self) -> bool {
        self.key.is_some()
    }

    /// Builds a new message with a fresh header
    pub fn msg(
        &mut self,
        msg_type: impl Into<String>,
        content: Value,
        parent: Option<&Header>,
    ) -> Message {
        let header = Header {
            msg_id: MessageId::new(),
            msg_type: msg_type.into(),
            session: self.id,
            username: self.username.clone(),
            counter: self.counter,
        };
        self.counter += 1;

        Message {
            header,
            parent_header: parent.cloned(),
            content,
        }
    }

    /// Serializes a message into wire frames behind the given identities
    pub fn serialize(
        &self,
        message: &Message,
        identities: &[Identity],
    ) -> Result<Frames, SessionError> {
        let header = serde_json::to_vec(&message.header)?;
        let parent = serde_json::to_vec(&parent_header::to_value(&message.parent_header)?)?;
        let content = serde_json::to_vec(&message.content)?;
        let signature = match self.mac(&[&header, &parent, &content])? {
            Some(mac) => hex::encode(mac.finalize().into_bytes()),
            None => String::new(),
        };

        let mut frames = Vec::with_capacity(identities.len() + 1 + BODY_FRAMES);
        frames.extend(identities.iter().map(|id| id.as_bytes().to_vec()));
        frames.push(DELIMITER.to_vec());
        frames.push(signature.into_bytes());
        frames.push(header);
        frames.push(parent);
        frames.push(content);
        Ok(frames)
    }

    /// Splits wire frames into routing identities and a message
    ///
    /// When the session has a key, the signature frame must match.
    pub fn deserialize(&self, frames: Frames) -> Result<(Vec<Identity>, Message), SessionError> {
        let split = frames
            .iter()
            .position(|frame| frame.as_slice() == DELIMITER)
            .ok_or(SessionError::MissingDelimiter)?;

        let mut frames = frames.into_iter();
        let identities: Vec<Identity> = frames.by_ref().take(split).map(Identity::new).collect();
        frames.next(); // delimiter

        let signature = frames.next().ok_or(SessionError::MissingPart("signature"))?;
        let header = frames.next().ok_or(SessionError::MissingPart("header"))?;
        let parent = frames
            .next()
            .ok_or(SessionError::MissingPart("parent_header"))?;
        let content = frames.next().ok_or(SessionError::MissingPart("content"))?;

        if let Some(mac) = self.mac(&[&header, &parent, &content])? {
            let signature = hex::decode(&signature).map_err(|_| SessionError::InvalidSignature)?;
            mac.verify_slice(&signature)
                .map_err(|_| SessionError::InvalidSignature)?;
        }

        let message = Message {
            header: serde_json::from_slice(&header)?,
            parent_header: parent_header::from_value(serde_json::from_slice(&parent)?)?,
            content: serde_json::from_slice(&content)?,
        };
        Ok((identities, message))
    }

    /// HMAC-SHA256 over the body parts, each prefixed with its length
    ///
    /// `None` when the session is unsigned.
    fn mac(&self, parts: &[&[u8]]) -> Result<Option<HmacSha256>, SessionError> {
        let Some(key) = &self.key else {
            return Ok(None);
        };

        let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::InvalidKey)?;
        for part in parts {
            mac.update(&(part.len() as u64).to_be_bytes());
            mac.update(part);
        }
        Ok(Some(mac))
    }
}

/// Returns the header of a message, for use as a parent tag
pub fn extract_header(message: &Message) -> Header {
    message.header.clone()
}
