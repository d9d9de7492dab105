use std::collections::HashMap;

use super::types::{ClientId, RoomId, SignalingError};

/// Registry entry for one live connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: ClientId,
    pub room: Option<RoomId>,
}

/// Tracks every live connection and the room it currently occupies.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ClientId, Option<RoomId>>,
    next_seq: u64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh identity with no room.
    pub fn register(&mut self) -> ClientId {
        let id = ClientId::generate(self.next_seq);
        self.next_seq += 1;
        self.connections.insert(id.clone(), None);
        id
    }

    pub fn lookup(&self, id: &ClientId) -> Result<ConnectionInfo, SignalingError> {
        self.connections
            .get(id)
            .map(|room| ConnectionInfo {
                id: id.clone(),
                room: room.clone(),
            })
            .ok_or_else(|| SignalingError::UnknownConnection(id.clone()))
    }

    /// Update the stored room. A no-op for ids that are not registered.
    pub fn set_room(&mut self, id: &ClientId, room: Option<RoomId>) {
        if let Some(slot) = self.connections.get_mut(id) {
            *slot = room;
        }
    }

    /// Remove the entry. Unregistering twice is a no-op.
    pub fn unregister(&mut self, id: &ClientId) -> Option<ConnectionInfo> {
        self.connections.remove(id).map(|room| ConnectionInfo {
            id: id.clone(),
            room,
        })
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClientId, Option<&RoomId>)> {
        self.connections.iter().map(|(id, room)| (id, room.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_starts_unjoined() {
        let mut registry = ConnectionRegistry::new();
        let id = registry.register();
        let info = registry.lookup(&id).unwrap();
        assert_eq!(info.id, id);
        assert_eq!(info.room, None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_never_reuses_identity() {
        let mut registry = ConnectionRegistry::new();
        let first = registry.register();
        registry.unregister(&first);
        let second = registry.register();
        assert_ne!(first, second);
    }

    #[test]
    fn lookup_unknown_fails() {
        let registry = ConnectionRegistry::new();
        let err = registry.lookup(&ClientId::from("ghost")).unwrap_err();
        assert!(matches!(err, SignalingError::UnknownConnection(_)));
    }

    #[test]
    fn set_room_updates_entry() {
        let mut registry = ConnectionRegistry::new();
        let id = registry.register();
        registry.set_room(&id, Some(RoomId::from("alpha")));
        assert_eq!(registry.lookup(&id).unwrap().room, Some(RoomId::from("alpha")));
        registry.set_room(&id, None);
        assert_eq!(registry.lookup(&id).unwrap().room, None);
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut registry = ConnectionRegistry::new();
        let id = registry.register();
        assert!(registry.unregister(&id).is_some());
        assert!(registry.unregister(&id).is_none());
        assert!(registry.is_empty());
        assert!(registry.lookup(&id).is_err());
    }
}
