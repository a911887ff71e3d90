//! Retrieval collaborators for Sibyl.
//!
//! Two independent sources feed the context block: live web search
//! (SearXNG or Tavily, selected at construction time) and a vector
//! knowledge index (embedding service + Elasticsearch kNN). The
//! [`ContextAssembler`] folds whichever sources a request enables into a
//! single textual context block, degrading to nothing on failure.

pub mod assembler;
pub mod search;
pub mod vector;

pub use assembler::ContextAssembler;
pub use search::{SearchBackend, SearchHit, WebSearch};
pub use vector::VectorIndex;
