//! Wire protocol: JSON text frames with a `type` discriminator and a `data`
//! payload.

use serde::{Deserialize, Serialize};

/// A single chat message body. The wire carries only the text — no sender,
/// no timestamp, no id — so this stays an opaque payload. Duplicates are
/// permitted; log entries are addressed by position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatMessage(String);

impl ChatMessage {
    pub fn new(body: impl Into<String>) -> Self {
        Self(body.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChatMessage {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ChatMessage {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Wrapping record in a history payload, one per historical message.
/// Only `data` survives decoding; any other envelope fields are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Envelope {
    pub data: ChatMessage,
}

/// One decoded inbound frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundFrame {
    /// Full log replacement, in received order.
    History(Vec<Envelope>),
    /// Single message to append to the log.
    Message(ChatMessage),
    /// Well-formed frame with a discriminator we don't recognize.
    Unknown { frame_type: String },
}

/// Decode failures for inbound frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("bad `{frame_type}` payload: {source}")]
    Payload {
        frame_type: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw two-field shape shared by every inbound frame.
#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    frame_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl InboundFrame {
    /// Decode one wire frame. An unknown discriminator is not an error; a
    /// frame that doesn't match the two-field shape, or a known frame with
    /// the wrong payload shape, is.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let raw: RawFrame = serde_json::from_str(text)?;
        match raw.frame_type.as_str() {
            "history" => {
                let envelopes: Vec<Envelope> =
                    serde_json::from_value(raw.data).map_err(|source| ProtocolError::Payload {
                        frame_type: "history",
                        source,
                    })?;
                Ok(Self::History(envelopes))
            }
            "message" => {
                let body: ChatMessage =
                    serde_json::from_value(raw.data).map_err(|source| ProtocolError::Payload {
                        frame_type: "message",
                        source,
                    })?;
                Ok(Self::Message(body))
            }
            _ => Ok(Self::Unknown {
                frame_type: raw.frame_type,
            }),
        }
    }
}

/// Outbound frames. The client only ever sends `message`.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum OutboundFrame {
    Message(String),
}

impl OutboundFrame {
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message(text.into())
    }

    /// Serialize for the wire. A `message` frame is a tag plus a JSON
    /// string; serialization cannot fail.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_history_frame() {
        let frame =
            InboundFrame::decode(r#"{"type":"history","data":[{"data":"a"},{"data":"b"}]}"#)
                .unwrap();
        let InboundFrame::History(envelopes) = frame else {
            panic!("expected history, got {frame:?}");
        };
        assert_eq!(envelopes.len(), 2);
        assert_eq!(envelopes[0].data.as_str(), "a");
        assert_eq!(envelopes[1].data.as_str(), "b");
    }

    #[test]
    fn decode_history_ignores_extra_envelope_fields() {
        let frame = InboundFrame::decode(
            r#"{"type":"history","data":[{"data":"a","sender":"bob","ts":123}]}"#,
        )
        .unwrap();
        assert_eq!(
            frame,
            InboundFrame::History(vec![Envelope {
                data: ChatMessage::new("a")
            }])
        );
    }

    #[test]
    fn decode_message_frame() {
        let frame = InboundFrame::decode(r#"{"type":"message","data":"hello"}"#).unwrap();
        assert_eq!(frame, InboundFrame::Message(ChatMessage::new("hello")));
    }

    #[test]
    fn decode_unknown_discriminator_is_not_an_error() {
        let frame = InboundFrame::decode(r#"{"type":"ping","data":{}}"#).unwrap();
        assert_eq!(
            frame,
            InboundFrame::Unknown {
                frame_type: "ping".into()
            }
        );
    }

    #[test]
    fn decode_unknown_discriminator_without_data() {
        let frame = InboundFrame::decode(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(frame, InboundFrame::Unknown { .. }));
    }

    #[test]
    fn decode_rejects_non_json() {
        let err = InboundFrame::decode("not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn decode_rejects_missing_discriminator() {
        let err = InboundFrame::decode(r#"{"data":"hello"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn decode_rejects_wrong_message_payload() {
        let err = InboundFrame::decode(r#"{"type":"message","data":42}"#).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Payload {
                frame_type: "message",
                ..
            }
        ));
    }

    #[test]
    fn decode_rejects_wrong_history_payload() {
        let err = InboundFrame::decode(r#"{"type":"history","data":"oops"}"#).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Payload {
                frame_type: "history",
                ..
            }
        ));
    }

    #[test]
    fn encode_outbound_message() {
        let frame = OutboundFrame::message("hi");
        assert_eq!(frame.encode(), r#"{"type":"message","data":"hi"}"#);
    }

    #[test]
    fn encode_preserves_raw_text() {
        let frame = OutboundFrame::message("  spaced  ");
        assert_eq!(frame.encode(), r#"{"type":"message","data":"  spaced  "}"#);
    }

    #[test]
    fn chat_message_display() {
        let msg = ChatMessage::new("hello");
        assert_eq!(msg.to_string(), "hello");
        assert_eq!(msg.into_string(), "hello");
    }
}
