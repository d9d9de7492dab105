use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::types::{ClientId, OutboundMessage, RoomId};

pub const INVALID_MESSAGE_FORMAT: &str = "Invalid message format";
pub const UNKNOWN_MESSAGE_TYPE: &str = "Unknown message type";
pub const ROOM_ID_REQUIRED: &str = "Room ID is required";
pub const NOT_IN_ROOM: &str = "Not in a room";

/// Inbound frame that cannot be read as a message.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid message format: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid message format: null")]
    Null,
}

/// Negotiation message kinds relayed without inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    Offer,
    Answer,
    IceCandidate,
}

impl RelayKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RelayKind::Offer => "offer",
            RelayKind::Answer => "answer",
            RelayKind::IceCandidate => "ice-candidate",
        }
    }
}

/// Messages sent from client to server, decoded from one text frame
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Join a room. `None` when the room id is missing, empty or not a string.
    Join { room: Option<RoomId> },

    /// Leave the current room
    Leave,

    /// Negotiation payload for the other occupant. `frame` is the inbound
    /// text exactly as received.
    Relay {
        kind: RelayKind,
        frame: OutboundMessage,
    },

    /// Any other `type`, or no string `type` at all
    Unknown { kind: Option<String> },
}

impl ClientMessage {
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(text)?;
        if value.is_null() {
            return Err(DecodeError::Null);
        }

        let kind = match value.get("type").and_then(Value::as_str) {
            Some(kind) => kind,
            None => return Ok(ClientMessage::Unknown { kind: None }),
        };

        let relay = |kind| ClientMessage::Relay {
            kind,
            frame: OutboundMessage::from(text.to_owned()),
        };

        Ok(match kind {
            "join" => {
                let room = value
                    .get("room")
                    .and_then(Value::as_str)
                    .filter(|room| !room.is_empty())
                    .map(RoomId::from);
                ClientMessage::Join { room }
            }
            "leave" => ClientMessage::Leave,
            "offer" => relay(RelayKind::Offer),
            "answer" => relay(RelayKind::Answer),
            "ice-candidate" => relay(RelayKind::IceCandidate),
            other => ClientMessage::Unknown {
                kind: Some(other.to_owned()),
            },
        })
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Sent once, immediately after the WebSocket handshake
    #[serde(rename = "connected")]
    Connected {
        #[serde(rename = "clientId")]
        client_id: ClientId,
    },

    /// Join succeeded; `participants` includes the sender
    #[serde(rename = "joined")]
    Joined { room: RoomId, participants: usize },

    /// Another connection joined the sender's room
    #[serde(rename = "user-joined")]
    UserJoined { room: RoomId, participants: usize },

    /// Another connection left the sender's room
    #[serde(rename = "user-left")]
    UserLeft { room: RoomId, participants: usize },

    /// Error response
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

impl From<&ServerMessage> for OutboundMessage {
    fn from(msg: &ServerMessage) -> Self {
        let json =
            serde_json::to_string(msg).expect("ServerMessage serialization should never fail");
        OutboundMessage::from(json)
    }
}

impl From<ServerMessage> for OutboundMessage {
    fn from(msg: ServerMessage) -> Self {
        OutboundMessage::from(&msg)
    }
}
