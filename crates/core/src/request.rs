//! The inbound chat request.

use serde::{Deserialize, Serialize};

/// A chat request as received on `POST /api/chat`.
///
/// Field names on the wire match the original frontend contract
/// (`useSearch`, `useRAG`, `maxToggle`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,

    /// Augment with live web-search results.
    #[serde(default, rename = "useSearch")]
    pub use_search: bool,

    /// Augment with knowledge-base passages.
    #[serde(default, rename = "useRAG")]
    pub use_rag: bool,

    /// Expanded retrieval: pull 10 knowledge passages instead of 5.
    #[serde(default, rename = "maxToggle")]
    pub max_toggle: bool,
}

impl ChatRequest {
    /// Create a plain request with all retrieval toggles off.
    pub fn plain(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            use_search: false,
            use_rag: false,
            max_toggle: false,
        }
    }

    /// Number of knowledge-base passages to retrieve.
    pub fn result_count(&self) -> usize {
        if self.max_toggle { 10 } else { 5 }
    }
}
