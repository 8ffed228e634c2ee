/// WebSocket real-time notification system
///
/// Architecture:
/// 1. handshake: admits or rejects an upgraded connection from its bearer credential
/// 2. registry: maps each admitted identity to its one live connection
/// 3. lifecycle: per-connection task that writes queued events and tears down on exit
/// 4. messages: wire format for server-pushed events and client frames

pub mod handshake;
pub mod lifecycle;
pub mod messages;
pub mod registry;

pub use messages::{Event, InboundFrame};
pub use registry::{BroadcastReport, ConnectionHandle, ConnectionId, ConnectionRegistry};
