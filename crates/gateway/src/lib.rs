//! HTTP gateway for Sibyl.
//!
//! Exposes the chat endpoint (SSE live event stream with `reasoning` and
//! `answer` channels), the history reset endpoint, and a health check.
//!
//! Built on Axum for high performance async HTTP.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    response::Json,
    response::sse::{Event as SseEvent, Sse},
    routing::{get, post},
};
use serde::Serialize;
use sibyl_core::history::HistoryStore;
use sibyl_core::request::ChatRequest;
use sibyl_engine::ChatEngine;
use sibyl_provider::OpenAiCompatClient;
use sibyl_retrieval::{ContextAssembler, SearchBackend, VectorIndex, WebSearch};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub engine: ChatEngine,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/clear-history", post(clear_history_handler))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the chat engine from configuration.
///
/// Retrieval backends are selected here, once, at construction time —
/// request handling never consults the config again.
pub fn build_engine(config: &sibyl_config::AppConfig) -> ChatEngine {
    let mut assembler = ContextAssembler::new();

    if let Some(base_url) = &config.search.base_url {
        let backend = match config.search.backend.as_str() {
            "tavily" => SearchBackend::Tavily {
                base_url: base_url.clone(),
                api_key: config.search.api_key.clone().unwrap_or_default(),
            },
            _ => SearchBackend::Searxng {
                base_url: base_url.clone(),
            },
        };
        assembler = assembler.with_search(WebSearch::new(backend), config.search.results);
    }

    if config.knowledge.enabled {
        assembler = assembler.with_knowledge(VectorIndex::from_config(&config.knowledge));
    }

    let upstream = OpenAiCompatClient::new(
        &config.upstream.api_url,
        config.upstream.api_key.clone().unwrap_or_default(),
        &config.upstream.model,
    );

    let history = Arc::new(HistoryStore::new(config.history.max_pairs));
    ChatEngine::new(assembler, upstream, history)
}

/// Start the gateway HTTP server.
pub async fn serve(config: sibyl_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = Arc::new(GatewayState {
        engine: build_engine(&config),
    });
    let app = build_router(state);

    info!(addr = %addr, model = %config.upstream.model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

/// `POST /api/chat` — run a chat turn, stream relay events back as SSE.
///
/// Each relay event becomes one SSE event named by its channel:
/// `reasoning` events carry `{"reasoning_content": ...}`, `answer`
/// events carry `{"content": ...}`. A failure is delivered as a final
/// `error` event; otherwise the stream just closes when the turn is done.
async fn chat_handler(
    State(state): State<SharedState>,
    Json(request): Json<ChatRequest>,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>> {
    info!(
        use_search = request.use_search,
        use_rag = request.use_rag,
        message_len = request.message.len(),
        "Chat request received"
    );

    let rx = state.engine.stream_chat(request).await;

    let stream = ReceiverStream::new(rx).map(|event| {
        let channel = event.channel();
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().event(channel).data(data))
    });

    Sse::new(stream)
}

#[derive(Serialize)]
struct ClearHistoryResponse {
    message: &'static str,
}

/// `POST /api/clear-history` — empty the shared conversation history.
async fn clear_history_handler(State(state): State<SharedState>) -> Json<ClearHistoryResponse> {
    state.engine.clear_history();
    Json(ClearHistoryResponse {
        message: "History cleared",
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
