//! Real-time channel - WebSocket connections, registry and fan-out

mod broadcaster;
mod messages;
mod registry;
mod ws_handler;

pub use self::broadcaster::Broadcaster;
pub use self::messages::{BroadcastEvent, ClientMessage};
pub use self::registry::{ConnectionId, ConnectionRegistry, Outbound};
pub use self::ws_handler::ws_handler;

/// Frames buffered per connection before events are dropped for it
pub const OUTBOUND_BUFFER: usize = 64;
