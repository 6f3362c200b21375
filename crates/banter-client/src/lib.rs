//! WebSocket chat client: the transport plumbing and the `Session` that
//! drives the core state machine.

pub mod config;
pub mod session;
pub mod transport;

pub use config::ClientConfig;
pub use session::Session;
pub use transport::{Connector, TransportHandle, WsConnector};
