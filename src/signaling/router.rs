//! Room membership state machine and negotiation relay.
//!
//! The router owns the [`ConnectionRegistry`] and [`RoomTable`] and never
//! performs I/O: every operation returns the list of [`Delivery`] values
//! the caller must hand to the transport, in order.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::messages::{
    ClientMessage, NOT_IN_ROOM, ROOM_ID_REQUIRED, RelayKind, ServerMessage, UNKNOWN_MESSAGE_TYPE,
};
use super::registry::ConnectionRegistry;
use super::rooms::RoomTable;
use super::types::{ClientId, OutboundMessage, ROOM_CAPACITY, RoomId, SignalingError};

/// One outbound frame addressed to one connection
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub to: ClientId,
    pub message: OutboundMessage,
}

impl Delivery {
    fn new(to: &ClientId, message: impl Into<OutboundMessage>) -> Self {
        Self {
            to: to.clone(),
            message: message.into(),
        }
    }
}

/// Point-in-time view of router state for introspection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub rooms: Vec<RoomId>,
    pub connections: usize,
}

#[derive(Debug, Default)]
pub struct Router {
    registry: ConnectionRegistry,
    rooms: RoomTable,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection. The caller owes it a `connected` frame.
    pub fn connect(&mut self) -> ClientId {
        self.registry.register()
    }

    pub fn handle(
        &mut self,
        id: &ClientId,
        msg: ClientMessage,
    ) -> Result<Vec<Delivery>, SignalingError> {
        let mut out = Vec::new();

        match msg {
            ClientMessage::Join { room: Some(room) } => self.join(id, room, &mut out)?,
            ClientMessage::Join { room: None } => {
                self.registry.lookup(id)?;
                out.push(Delivery::new(id, ServerMessage::error(ROOM_ID_REQUIRED)));
            }
            ClientMessage::Leave => self.leave(id, &mut out)?,
            ClientMessage::Relay { kind, frame } => self.relay(id, kind, frame, &mut out)?,
            ClientMessage::Unknown { kind } => {
                self.registry.lookup(id)?;
                warn!("Unknown message type from {}: {:?}", id, kind);
                out.push(Delivery::new(id, ServerMessage::error(UNKNOWN_MESSAGE_TYPE)));
            }
        }

        Ok(out)
    }

    /// Run the leave effect if joined, then forget the connection.
    /// Disconnecting an unknown id yields nothing.
    pub fn disconnect(&mut self, id: &ClientId) -> Vec<Delivery> {
        let mut out = Vec::new();
        if self.leave(id, &mut out).is_ok() {
            self.registry.unregister(id);
            info!("Client {} disconnected", id);
        }
        out
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            rooms: self.rooms.room_ids(),
            connections: self.registry.len(),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomTable {
        &self.rooms
    }

    fn join(
        &mut self,
        id: &ClientId,
        room: RoomId,
        out: &mut Vec<Delivery>,
    ) -> Result<(), SignalingError> {
        let info = self.registry.lookup(id)?;

        if let Some(current) = info.room {
            self.leave_room(id, &current, out);
        }

        match self.rooms.try_add(&room, id) {
            Ok(participants) => {
                self.registry.set_room(id, Some(room.clone()));
                info!(
                    "Client {} joined room {} ({}/{})",
                    id, room, participants, ROOM_CAPACITY
                );

                out.push(Delivery::new(
                    id,
                    ServerMessage::Joined {
                        room: room.clone(),
                        participants,
                    },
                ));

                let notice = OutboundMessage::from(ServerMessage::UserJoined {
                    room: room.clone(),
                    participants,
                });
                for peer in self.rooms.peers(&room, id) {
                    out.push(Delivery::new(&peer, notice.clone()));
                }
            }
            Err(e @ SignalingError::RoomFull(_)) => {
                info!("Client {} rejected from full room {}", id, room);
                out.push(Delivery::new(id, ServerMessage::error(e.to_string())));
            }
            Err(e) => return Err(e),
        }

        Ok(())
    }

    fn leave(&mut self, id: &ClientId, out: &mut Vec<Delivery>) -> Result<(), SignalingError> {
        let info = self.registry.lookup(id)?;
        if let Some(room) = info.room {
            self.leave_room(id, &room, out);
        }
        Ok(())
    }

    fn leave_room(&mut self, id: &ClientId, room: &RoomId, out: &mut Vec<Delivery>) {
        let participants = self.rooms.remove(room, id);
        self.registry.set_room(id, None);
        info!("Client {} left room {}", id, room);

        if participants == 0 {
            info!("Room {} deleted (empty)", room);
            return;
        }

        let notice = OutboundMessage::from(ServerMessage::UserLeft {
            room: room.clone(),
            participants,
        });
        for peer in self.rooms.members(room) {
            out.push(Delivery::new(peer, notice.clone()));
        }
    }

    fn relay(
        &self,
        id: &ClientId,
        kind: RelayKind,
        frame: OutboundMessage,
        out: &mut Vec<Delivery>,
    ) -> Result<(), SignalingError> {
        let Some(room) = self.registry.lookup(id)?.room else {
            out.push(Delivery::new(id, ServerMessage::error(NOT_IN_ROOM)));
            return Ok(());
        };

        let peers = self.rooms.peers(&room, id);
        if peers.is_empty() {
            debug!("Dropping {} from {}: no peer in room {}", kind.as_str(), id, room);
        }
        for peer in peers {
            out.push(Delivery::new(&peer, frame.clone()));
        }
        Ok(())
    }
}
