//! Chat turn orchestration.

use std::sync::Arc;

use sibyl_core::history::HistoryStore;
use sibyl_core::message::Turn;
use sibyl_core::request::ChatRequest;
use sibyl_core::stream::RelayEvent;
use sibyl_provider::OpenAiCompatClient;
use sibyl_retrieval::ContextAssembler;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Instruction prepended to the synthetic context turn.
const CONTEXT_PROMPT: &str =
    "Answer the user's question using the following reference material:";

/// Runs chat turns: context assembly → history mutation → upstream
/// stream → relay. One engine is shared by all concurrent requests; the
/// history store is the only cross-request state.
pub struct ChatEngine {
    assembler: ContextAssembler,
    upstream: OpenAiCompatClient,
    history: Arc<HistoryStore>,
}

impl ChatEngine {
    pub fn new(
        assembler: ContextAssembler,
        upstream: OpenAiCompatClient,
        history: Arc<HistoryStore>,
    ) -> Self {
        Self {
            assembler,
            upstream,
            history,
        }
    }

    /// The shared history store.
    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Run one chat turn, returning the caller's live event stream.
    ///
    /// The context and user turns are appended to history before the
    /// upstream call: a stream that dies mid-turn still leaves the
    /// user's message in history, but never a partial assistant reply.
    /// Failures (including failure to open the upstream stream) arrive
    /// as a final `error` event; a clean close signals completion.
    pub async fn stream_chat(&self, request: ChatRequest) -> mpsc::Receiver<RelayEvent> {
        let (tx, rx) = mpsc::channel(64);

        let context = self.assembler.assemble(&request).await;
        if !context.is_empty() {
            self.history
                .append(Turn::system(format!("{CONTEXT_PROMPT}\n{context}")));
        }
        self.history.append(Turn::user(&request.message));

        let turns = self.history.snapshot();
        info!(turns = turns.len(), "Opening upstream chat stream");

        match self.upstream.stream_chat(&turns).await {
            Ok(deltas) => {
                let history = self.history.clone();
                tokio::spawn(async move {
                    crate::relay::run(deltas, tx, history).await;
                });
            }
            Err(e) => {
                warn!(error = %e, "Failed to open upstream stream");
                let _ = tx
                    .send(RelayEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
            }
        }

        rx
    }

    /// Clear the shared conversation history.
    pub fn clear_history(&self) {
        self.history.clear();
        info!("Conversation history cleared");
    }
}
