//! Unique identifiers for sessions, messages and routing envelopes

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Declares a random UUID id type that serializes as a bare string
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a fresh random id
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for a messaging session
    ///
    /// Every participant (the kernel and each frontend) owns one session.
    /// The id is stamped into every header the participant produces.
    SessionId
}

uuid_id! {
    /// Unique identifier for a message
    MessageId
}

/// Routing identity of a peer on a request/reply channel
///
/// Identities are opaque byte strings. A frontend announces its identity
/// when it connects; the kernel echoes the identity frames of a request
/// in front of the reply so the transport can route it back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity(Vec<u8>);

impl Identity {
    /// Creates an identity from raw bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Creates a random identity (a UUID rendered as text)
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string().into_bytes())
    }

    /// Returns the raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the identity, returning the raw bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}
