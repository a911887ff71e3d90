//! Context assembly.
//!
//! Folds whichever retrieval sources a request enables into one textual
//! context block: web-search hits first, knowledge-base passages second.
//! A collaborator failure never aborts the chat turn — it is logged and
//! treated as an empty result set.

use sibyl_core::ChatRequest;
use tracing::{info, warn};

use crate::search::{SearchHit, WebSearch};
use crate::vector::VectorIndex;

/// Builds the per-request retrieval context string.
pub struct ContextAssembler {
    search: Option<WebSearch>,
    knowledge: Option<VectorIndex>,
    search_results: usize,
}

impl ContextAssembler {
    /// An assembler with no collaborators — every context is empty.
    pub fn new() -> Self {
        Self {
            search: None,
            knowledge: None,
            search_results: 3,
        }
    }

    pub fn with_search(mut self, search: WebSearch, results: usize) -> Self {
        self.search = Some(search);
        self.search_results = results;
        self
    }

    pub fn with_knowledge(mut self, knowledge: VectorIndex) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    /// Assemble the retrieval context for one request.
    ///
    /// Returns the empty string when both toggles are off, both sources
    /// come back empty, or the enabled collaborators fail.
    pub async fn assemble(&self, request: &ChatRequest) -> String {
        let mut context = String::new();

        if request.use_search {
            if let Some(search) = &self.search {
                match search.search(&request.message, self.search_results).await {
                    Ok(hits) => {
                        if !hits.is_empty() {
                            info!(count = hits.len(), "Folding web search results into context");
                            context.push_str(&render_search_section(&hits));
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Web search failed, continuing without it");
                    }
                }
            }
        }

        if request.use_rag {
            if let Some(knowledge) = &self.knowledge {
                match knowledge
                    .top_passages(request.result_count(), &request.message)
                    .await
                {
                    Ok(passages) => {
                        if !passages.is_empty() {
                            info!(count = passages.len(), "Folding knowledge passages into context");
                            context.push_str(&render_knowledge_section(&passages));
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Knowledge lookup failed, continuing without it");
                    }
                }
            }
        }

        context
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Render web-search hits as numbered blocks under a section heading.
fn render_search_section(hits: &[SearchHit]) -> String {
    let mut section = String::from("\n\nWeb search results:\n");
    for (i, hit) in hits.iter().enumerate() {
        section.push_str(&format!("\n{}. {}\n", i + 1, hit.title));
        section.push_str(&format!("   {}\n", hit.content));
        section.push_str(&format!("   Source: {}\n", hit.url));
    }
    section
}

/// Render knowledge passages under a section heading.
fn render_knowledge_section(passages: &[String]) -> String {
    let mut section = String::from("\n\nKnowledge base references:\n");
    for passage in passages {
        section.push_str(passage);
        section.push('\n');
    }
    section
}
