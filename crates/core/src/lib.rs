//! # Sibyl Core
//!
//! Domain types and error definitions for the Sibyl chat relay engine.
//! This crate has **zero framework dependencies** — it defines the value
//! objects that flow through the system (turns, deltas, relay events) and
//! the shared conversation history store that all other crates build on.

pub mod error;
pub mod history;
pub mod message;
pub mod request;
pub mod stream;

// Re-export key types at crate root for ergonomics
pub use error::{RetrievalError, UpstreamError};
pub use history::HistoryStore;
pub use message::{Role, Turn};
pub use request::ChatRequest;
pub use stream::{DeltaKind, RelayEvent, StreamDelta};
