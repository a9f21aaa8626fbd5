//! Networking - server connection and the session client loop
//!
//! - `transport` - text-frame transport traits and the WebSocket implementation
//! - `memory` - channel-backed transport for offline runs and tests
//! - `connection` - reconnecting connection manager
//! - `client` - serializes UI commands and server events into the coordinator

pub mod client;
pub mod connection;
pub mod error;
pub mod memory;
pub mod transport;

pub use client::{ClientCommand, PendingRequest, SessionClient};
pub use connection::{ConnectionManager, ConnectionState, ConnectionStatus, NetEvent};
pub use error::{NetworkError, NetworkResult};
pub use transport::{Connector, Transport, WebSocketConnector};
