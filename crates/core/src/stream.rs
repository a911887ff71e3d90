//! Streaming value objects.
//!
//! `StreamDelta` is one decoded incremental unit from the upstream model;
//! `RelayEvent` is the outward unit pushed to the caller over SSE. The
//! relay translates the former into the latter one-for-one, in order.

use serde::{Deserialize, Serialize};

/// The two semantically distinct channels an upstream delta can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaKind {
    /// Intermediate reasoning tokens (`reasoning_content` in the wire delta).
    Reasoning,
    /// Final answer tokens (`content` in the wire delta).
    Answer,
}

/// A decoded incremental unit from the upstream stream.
///
/// Terminal conditions are not deltas: a clean end is signalled by the
/// delta channel closing, a failure by an `Err` item on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDelta {
    pub kind: DeltaKind,
    pub text: String,
}

impl StreamDelta {
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            kind: DeltaKind::Reasoning,
            text: text.into(),
        }
    }

    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            kind: DeltaKind::Answer,
            text: text.into(),
        }
    }
}

/// An outward event pushed to the caller's live event stream.
///
/// Serializes to just the payload object — the channel name travels as the
/// SSE event name (see [`RelayEvent::channel`]):
///
/// - `reasoning` → `{"reasoning_content": "..."}`
/// - `answer`    → `{"content": "..."}`
/// - `error`     → `{"message": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelayEvent {
    /// One incremental reasoning chunk.
    Reasoning { reasoning_content: String },

    /// One incremental answer chunk.
    Answer { content: String },

    /// The stream failed — this is always the final event.
    Error { message: String },
}

impl RelayEvent {
    /// SSE event name for this event.
    pub fn channel(&self) -> &'static str {
        match self {
            Self::Reasoning { .. } => "reasoning",
            Self::Answer { .. } => "answer",
            Self::Error { .. } => "error",
        }
    }
}

impl From<StreamDelta> for RelayEvent {
    fn from(delta: StreamDelta) -> Self {
        match delta.kind {
            DeltaKind::Reasoning => Self::Reasoning {
                reasoning_content: delta.text,
            },
            DeltaKind::Answer => Self::Answer { content: delta.text },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasoning_event_payload() {
        let event = RelayEvent::Reasoning {
            reasoning_content: "hmm".into(),
        };
        assert_eq!(event.channel(), "reasoning");
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"reasoning_content":"hmm"}"#
        );
    }

    #[test]
    fn answer_event_payload() {
        let event = RelayEvent::Answer {
            content: "42".into(),
        };
        assert_eq!(event.channel(), "answer");
        assert_eq!(serde_json::to_string(&event).unwrap(), r#"{"content":"42"}"#);
    }

    #[test]
    fn error_event_payload() {
        let event = RelayEvent::Error {
            message: "boom".into(),
        };
        assert_eq!(event.channel(), "error");
        assert!(serde_json::to_string(&event).unwrap().contains("boom"));
    }

    #[test]
    fn delta_maps_to_matching_channel() {
        assert_eq!(
            RelayEvent::from(StreamDelta::reasoning("a")).channel(),
            "reasoning"
        );
        assert_eq!(RelayEvent::from(StreamDelta::answer("x")).channel(), "answer");
    }

    #[test]
    fn event_deserialization() {
        let event: RelayEvent = serde_json::from_str(r#"{"content":"hi"}"#).unwrap();
        assert_eq!(
            event,
            RelayEvent::Answer {
                content: "hi".into()
            }
        );
    }
}
