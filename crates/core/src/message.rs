//! Turn domain types.
//!
//! A `Turn` is one message unit in the rolling conversation:
//! the user asks → retrieval context is injected as a system turn →
//! the assistant answers (optionally with a reasoning trace).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Synthetic instructions (retrieval context block)
    System,
    /// The end user
    User,
    /// The upstream model
    Assistant,
}

/// A single turn in the conversation history.
///
/// Immutable once appended to the [`HistoryStore`](crate::HistoryStore).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn ID
    pub id: String,

    /// Who produced this turn
    pub role: Role,

    /// The text content
    pub content: String,

    /// Intermediate reasoning trace (assistant turns only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a new user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, None)
    }

    /// Create a new synthetic system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content, None)
    }

    /// Create a new assistant turn with an optional reasoning trace.
    pub fn assistant(content: impl Into<String>, reasoning: Option<String>) -> Self {
        Self::new(Role::Assistant, content, reasoning)
    }

    fn new(role: Role, content: impl Into<String>, reasoning: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            reasoning,
            timestamp: Utc::now(),
        }
    }
}
