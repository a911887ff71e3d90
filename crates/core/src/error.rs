//! Error types for the Sibyl domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Each bounded context
//! has its own error enum, matching how failures are handled:
//!
//! - [`RetrievalError`] — recovered locally; the chat turn proceeds with an
//!   empty context and the caller never sees it.
//! - [`UpstreamError`] — fatal to the current turn; surfaced to the caller
//!   as a stream error and the assistant turn is not committed.
//!
//! A disconnected caller is not an error value: it surfaces as closure of
//! the event channel and the relay just stops.

use thiserror::Error;

/// A search or vector-lookup failure. Always degrades to "no results".
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Web search failed: {0}")]
    SearchFailed(String),

    #[error("Embedding lookup failed: {0}")]
    EmbeddingFailed(String),

    #[error("Knowledge index query failed: {0}")]
    IndexQueryFailed(String),

    #[error("Retrieval backend returned HTTP {status_code}: {message}")]
    Http { status_code: u16, message: String },
}

/// A failure talking to the upstream LLM provider.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    /// A malformed stream line. Fatal for the whole stream — skipping it
    /// could desynchronize the accumulated text.
    #[error("Malformed stream payload: {0}")]
    Protocol(String),

    #[error("Stream interrupted: {0}")]
    Interrupted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_api_error_displays_status() {
        let err = UpstreamError::Api {
            status_code: 502,
            message: "bad gateway".into(),
        };
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("bad gateway"));
    }

    #[test]
    fn retrieval_error_displays_source() {
        let err = RetrievalError::SearchFailed("timeout".into());
        assert!(err.to_string().contains("Web search failed"));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn protocol_error_names_the_payload_problem() {
        let err = UpstreamError::Protocol("expected value at line 1".into());
        assert!(err.to_string().contains("Malformed stream payload"));
    }
}
