//! Protocol types and the connection-session state machine, free of I/O.

pub mod protocol;
pub mod state;

pub use protocol::{ChatMessage, Envelope, InboundFrame, OutboundFrame, ProtocolError};
pub use state::{ConnectionState, SessionSnapshot, SessionState, TransportEvent, CONNECT_ERROR_TEXT};
