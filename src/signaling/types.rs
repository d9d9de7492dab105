use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Utf8Bytes;

/// Maximum number of connections a room admits.
pub const ROOM_CAPACITY: usize = 2;

/// Signaling server errors
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("unknown connection: {0}")]
    UnknownConnection(ClientId),

    #[error("Room is full (maximum {} participants)", ROOM_CAPACITY)]
    RoomFull(RoomId),

    #[error("internal error: {0}")]
    Internal(String),
}

const BASE36_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const CLIENT_ID_PREFIX_LEN: usize = 5;

/// Identity assigned to a connection at accept time.
///
/// A fixed-width random prefix followed by the base-36 rendering of a
/// sequence number. Sequence numbers are never handed out twice, so two
/// ids built from different sequence numbers always differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn generate(seq: u64) -> Self {
        let mut rng = rand::rng();
        let mut id = String::with_capacity(CLIENT_ID_PREFIX_LEN + 13);
        for _ in 0..CLIENT_ID_PREFIX_LEN {
            id.push(BASE36_CHARS[rng.random_range(0..BASE36_CHARS.len())] as char);
        }
        push_base36(&mut id, seq);
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn push_base36(out: &mut String, mut value: u64) {
    let mut digits = [0u8; 13];
    let mut len = 0;
    loop {
        digits[len] = BASE36_CHARS[(value % 36) as usize];
        len += 1;
        value /= 36;
        if value == 0 {
            break;
        }
    }
    out.extend(digits[..len].iter().rev().map(|&b| b as char));
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Caller-chosen room name. Opaque and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Wrapper for outbound WebSocket messages using tungstenite's Utf8Bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage(Utf8Bytes);

impl OutboundMessage {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Get the inner Utf8Bytes for tungstenite Message::Text
    pub fn into_inner(self) -> Utf8Bytes {
        self.0
    }
}

impl From<String> for OutboundMessage {
    fn from(s: String) -> Self {
        Self(Utf8Bytes::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_is_lowercase_base36() {
        let id = ClientId::generate(123_456);
        assert!(
            id.as_str()
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
    }

    #[test]
    fn client_id_encodes_sequence_after_prefix() {
        let id = ClientId::generate(36 * 36 + 1);
        assert_eq!(&id.as_str()[CLIENT_ID_PREFIX_LEN..], "101");

        let id = ClientId::generate(0);
        assert_eq!(&id.as_str()[CLIENT_ID_PREFIX_LEN..], "0");
    }

    #[test]
    fn client_id_handles_max_sequence() {
        let id = ClientId::generate(u64::MAX);
        assert_eq!(&id.as_str()[CLIENT_ID_PREFIX_LEN..], "3w5e11264sgsf");
    }

    #[test]
    fn client_ids_differ_across_sequence_numbers() {
        let ids: std::collections::HashSet<_> = (0..10_000).map(ClientId::generate).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn room_id_is_case_sensitive() {
        assert_ne!(RoomId::from("Alpha"), RoomId::from("alpha"));
    }

    #[test]
    fn room_id_serialization() {
        let room = RoomId::from("alpha");
        assert_eq!(serde_json::to_string(&room).unwrap(), "\"alpha\"");
    }

    #[test]
    fn client_id_display() {
        let id = ClientId::from("abc12345");
        assert_eq!(format!("{}", id), "abc12345");
    }

    #[test]
    fn room_full_message_is_client_facing() {
        let err = SignalingError::RoomFull(RoomId::from("alpha"));
        assert_eq!(err.to_string(), "Room is full (maximum 2 participants)");
    }
}
