use std::collections::HashMap;

use super::types::{ClientId, ROOM_CAPACITY, RoomId, SignalingError};

#[derive(Debug, Default)]
pub(crate) struct Room {
    /// Join order is kept so notifications are emitted deterministically.
    pub members: Vec<ClientId>,
}

/// Maps room ids to their occupants. A room exists only while it has
/// at least one member, except transiently between `ensure` and `try_add`.
#[derive(Debug, Default)]
pub struct RoomTable {
    rooms: HashMap<RoomId, Room>,
}

impl RoomTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn ensure(&mut self, room: &RoomId) -> &mut Room {
        self.rooms.entry(room.clone()).or_default()
    }

    /// Add `id` to the room, creating it on first use. Returns the new
    /// member count, or `RoomFull` without touching state.
    pub fn try_add(&mut self, room_id: &RoomId, id: &ClientId) -> Result<usize, SignalingError> {
        let room = self.ensure(room_id);

        if room.members.contains(id) {
            return Ok(room.members.len());
        }

        if room.members.len() >= ROOM_CAPACITY {
            return Err(SignalingError::RoomFull(room_id.clone()));
        }

        room.members.push(id.clone());
        Ok(room.members.len())
    }

    /// Remove `id` if present and drop the room once empty. Returns the
    /// remaining member count (0 if the room did not exist).
    pub fn remove(&mut self, room_id: &RoomId, id: &ClientId) -> usize {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return 0;
        };

        room.members.retain(|member| member != id);
        let remaining = room.members.len();

        if remaining == 0 {
            self.rooms.remove(room_id);
        }
        remaining
    }

    /// Other members of the room, excluding `id`.
    pub fn peers(&self, room_id: &RoomId, id: &ClientId) -> Vec<ClientId> {
        self.rooms
            .get(room_id)
            .map(|room| {
                room.members
                    .iter()
                    .filter(|member| *member != id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn members(&self, room_id: &RoomId) -> &[ClientId] {
        self.rooms
            .get(room_id)
            .map(|room| room.members.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Room ids in sorted order
    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.rooms.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
