//! The session state machine: one transition function over an ordered
//! transport event stream.

use serde::Serialize;

use crate::protocol::{ChatMessage, InboundFrame};

/// Observable connection status of one session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
    Errored,
}

/// Everything the transport can tell the session, as one ordered event
/// stream. Events must be applied in wire-arrival order.
#[derive(Clone, Debug)]
pub enum TransportEvent {
    /// Connection established.
    Opened,
    /// One inbound text frame, undecoded.
    Frame(String),
    /// Transport failure. The reason is logged, never shown to the user.
    Failed(String),
    /// Connection gone, cleanly or not.
    Closed,
}

/// Fixed user-facing description for any transport failure. The specific
/// underlying error goes to the operational log only.
pub const CONNECT_ERROR_TEXT: &str = "Failed to connect to the chat server";

/// Connection state, message log, and last error for one session.
///
/// Pure state: all I/O lives with the caller, which makes every transition
/// deterministic and testable without a socket.
#[derive(Debug, Default)]
pub struct SessionState {
    connection: ConnectionState,
    messages: Vec<ChatMessage>,
    last_error: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Atomic read model for the rendering layer.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connection: self.connection(),
            messages: self.messages.clone(),
            last_error: self.last_error.clone(),
        }
    }

    /// Apply one transport event.
    pub fn apply(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => {
                self.connection = ConnectionState::Connected;
                self.last_error = None;
                tracing::info!("connected to chat server");
            }
            TransportEvent::Failed(reason) => {
                self.connection = ConnectionState::Errored;
                self.last_error = Some(CONNECT_ERROR_TEXT.to_owned());
                tracing::warn!(reason = %reason, "transport failure");
            }
            TransportEvent::Closed => {
                // Closing after an error keeps the error text; closing after
                // a clean run leaves it unset.
                self.connection = ConnectionState::Disconnected;
                tracing::info!("disconnected from chat server");
            }
            TransportEvent::Frame(text) => self.apply_frame(&text),
        }
    }

    fn apply_frame(&mut self, text: &str) {
        match InboundFrame::decode(text) {
            Ok(InboundFrame::History(envelopes)) => {
                // Every history frame replaces the whole log, last wins.
                self.messages = envelopes.into_iter().map(|e| e.data).collect();
                tracing::debug!(count = self.messages.len(), "history snapshot applied");
            }
            Ok(InboundFrame::Message(body)) => {
                self.messages.push(body);
            }
            Ok(InboundFrame::Unknown { frame_type }) => {
                tracing::debug!(frame_type = %frame_type, "ignoring unknown frame");
            }
            Err(err) => {
                // One bad frame must not take the session down.
                tracing::warn!(error = %err, "dropping malformed frame");
            }
        }
    }
}

/// Snapshot of {connection, messages, last error} handed to the rendering
/// layer on every state change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub connection: ConnectionState,
    pub messages: Vec<ChatMessage>,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_frame(body: &str) -> TransportEvent {
        TransportEvent::Frame(format!(r#"{{"type":"message","data":"{body}"}}"#))
    }

    #[test]
    fn initial_state_is_disconnected_and_empty() {
        let state = SessionState::new();
        assert_eq!(state.connection(), ConnectionState::Disconnected);
        assert!(state.messages().is_empty());
        assert!(state.last_error().is_none());
    }

    #[test]
    fn opened_connects_and_clears_error() {
        let mut state = SessionState::new();
        state.apply(TransportEvent::Failed("refused".into()));
        assert_eq!(state.connection(), ConnectionState::Errored);
        assert_eq!(state.last_error(), Some(CONNECT_ERROR_TEXT));

        state.apply(TransportEvent::Opened);
        assert_eq!(state.connection(), ConnectionState::Connected);
        assert!(state.last_error().is_none());
    }

    #[test]
    fn history_replaces_prior_log() {
        let mut state = SessionState::new();
        state.apply(message_frame("stale"));
        assert_eq!(state.messages().len(), 1);

        state.apply(TransportEvent::Frame(
            r#"{"type":"history","data":[{"data":"a"},{"data":"b"}]}"#.into(),
        ));
        let bodies: Vec<&str> = state.messages().iter().map(ChatMessage::as_str).collect();
        assert_eq!(bodies, ["a", "b"]);
    }

    #[test]
    fn second_history_replaces_again() {
        let mut state = SessionState::new();
        state.apply(TransportEvent::Frame(
            r#"{"type":"history","data":[{"data":"a"},{"data":"b"}]}"#.into(),
        ));
        state.apply(TransportEvent::Frame(
            r#"{"type":"history","data":[{"data":"c"}]}"#.into(),
        ));
        let bodies: Vec<&str> = state.messages().iter().map(ChatMessage::as_str).collect();
        assert_eq!(bodies, ["c"]);
    }

    #[test]
    fn messages_append_in_arrival_order() {
        let mut state = SessionState::new();
        state.apply(TransportEvent::Frame(
            r#"{"type":"history","data":[{"data":"old"}]}"#.into(),
        ));
        for body in ["m1", "m2", "m3"] {
            state.apply(message_frame(body));
        }
        let bodies: Vec<&str> = state.messages().iter().map(ChatMessage::as_str).collect();
        assert_eq!(bodies, ["old", "m1", "m2", "m3"]);
    }

    #[test]
    fn duplicate_messages_are_kept() {
        let mut state = SessionState::new();
        state.apply(message_frame("same"));
        state.apply(message_frame("same"));
        assert_eq!(state.messages().len(), 2);
    }

    #[test]
    fn error_then_close_keeps_error_text() {
        let mut state = SessionState::new();
        state.apply(TransportEvent::Opened);
        state.apply(TransportEvent::Failed("connection reset".into()));
        state.apply(TransportEvent::Closed);

        assert_eq!(state.connection(), ConnectionState::Disconnected);
        assert_eq!(state.last_error(), Some(CONNECT_ERROR_TEXT));
    }

    #[test]
    fn clean_close_leaves_error_unset() {
        let mut state = SessionState::new();
        state.apply(TransportEvent::Opened);
        state.apply(TransportEvent::Closed);

        assert_eq!(state.connection(), ConnectionState::Disconnected);
        assert!(state.last_error().is_none());
    }

    #[test]
    fn repeated_close_is_idempotent() {
        let mut state = SessionState::new();
        state.apply(TransportEvent::Closed);
        state.apply(TransportEvent::Closed);
        assert_eq!(state.connection(), ConnectionState::Disconnected);
    }

    #[test]
    fn unknown_frame_changes_nothing() {
        let mut state = SessionState::new();
        state.apply(TransportEvent::Opened);
        state.apply(message_frame("kept"));
        let before = state.snapshot();

        state.apply(TransportEvent::Frame(r#"{"type":"ping","data":{}}"#.into()));
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn malformed_frame_is_dropped_without_state_change() {
        let mut state = SessionState::new();
        state.apply(TransportEvent::Opened);
        state.apply(message_frame("kept"));
        let before = state.snapshot();

        state.apply(TransportEvent::Frame("garbage".into()));
        state.apply(TransportEvent::Frame(r#"{"type":"message","data":42}"#.into()));
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn snapshot_reflects_current_state() {
        let mut state = SessionState::new();
        state.apply(TransportEvent::Opened);
        state.apply(message_frame("hello"));

        let snap = state.snapshot();
        assert_eq!(snap.connection, ConnectionState::Connected);
        assert_eq!(snap.messages, vec![ChatMessage::new("hello")]);
        assert!(snap.last_error.is_none());
    }
}
