//! WebSocket signaling relay for two-party rooms

mod actor;
mod messages;
mod registry;
mod rooms;
mod router;
mod server;
mod types;

pub use actor::HubHandle;
pub use messages::{ClientMessage, DecodeError, RelayKind, ServerMessage};
pub use registry::{ConnectionInfo, ConnectionRegistry};
pub use rooms::RoomTable;
pub use router::{Delivery, Router, Snapshot};
pub use server::SignalingServer;
pub use types::{ClientId, OutboundMessage, ROOM_CAPACITY, RoomId, SignalingError};
