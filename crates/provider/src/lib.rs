//! Upstream streaming client.
//!
//! Sends the conversation to an OpenAI-compatible `/chat/completions`
//! endpoint with `stream: true` and exposes the response as a lazy
//! sequence of decoded [`StreamDelta`]s. Works with DeepSeek, OpenAI,
//! vLLM, and any endpoint speaking the same SSE dialect, including the
//! `reasoning_content` extension used by reasoning models.

mod sse;

use futures::StreamExt;
use serde::Serialize;
use sibyl_core::error::UpstreamError;
use sibyl_core::message::{Role, Turn};
use sibyl_core::stream::StreamDelta;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::sse::{LineBuffer, SsePayload};

/// A streaming chat-completions client bound to one endpoint and model.
pub struct OpenAiCompatClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    /// Create a new client.
    ///
    /// The HTTP client tolerates very long-lived responses: reasoning
    /// models can stream for minutes, so the overall timeout is set to
    /// ten minutes with no per-chunk deadline.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .timeout(std::time::Duration::from_secs(600))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Convert turns to the wire message format.
    ///
    /// Only role and content go upstream — a stored reasoning trace is
    /// never echoed back to the provider.
    fn to_api_messages(turns: &[Turn]) -> Vec<ApiMessage> {
        turns
            .iter()
            .map(|t| ApiMessage {
                role: match t.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: t.content.clone(),
            })
            .collect()
    }

    /// Open a streaming chat completion for the given turns.
    ///
    /// Returns a channel of decoded deltas. The channel closes cleanly on
    /// the `[DONE]` marker or on end of the byte stream; any failure
    /// (transport error, malformed payload) arrives as a single `Err`
    /// item and ends the stream. Dropping the receiver stops the decode
    /// task and releases the connection.
    pub async fn stream_chat(
        &self,
        turns: &[Turn],
    ) -> Result<mpsc::Receiver<Result<StreamDelta, UpstreamError>>, UpstreamError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "messages": Self::to_api_messages(turns),
            "stream": true,
        });

        debug!(model = %self.model, turns = turns.len(), "Opening upstream stream");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            return Err(UpstreamError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Upstream returned error");
            return Err(UpstreamError::Api {
                status_code: status,
                message: error_body,
            });
        }

        let (tx, rx) = mpsc::channel(64);

        // Decode task: read the SSE byte stream line by line and forward deltas.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = LineBuffer::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(UpstreamError::Interrupted(e.to_string()))).await;
                        return;
                    }
                };

                buffer.extend(&bytes);

                while let Some(line) = buffer.next_line() {
                    if forward_line(&line, &tx).await == LineOutcome::Stop {
                        return;
                    }
                }
            }

            // Byte-stream EOF: flush a final line that arrived without
            // its newline, then end — this is also a normal completion.
            if let Some(line) = buffer.take_remainder() {
                let _ = forward_line(&line, &tx).await;
            }
        });

        Ok(rx)
    }

    /// Can we reach the upstream endpoint?
    pub async fn health_check(&self) -> Result<bool, UpstreamError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum LineOutcome {
    Continue,
    Stop,
}

/// Decode one framed line and push its deltas downstream.
async fn forward_line(
    line: &str,
    tx: &mpsc::Sender<Result<StreamDelta, UpstreamError>>,
) -> LineOutcome {
    // Blank lines separate SSE events; ':' lines are comments.
    if line.is_empty() || line.starts_with(':') {
        return LineOutcome::Continue;
    }

    let Some(data) = line.strip_prefix("data: ") else {
        return LineOutcome::Continue;
    };

    match sse::decode_data(data.trim()) {
        Ok(SsePayload::Done) => LineOutcome::Stop,
        Ok(SsePayload::Deltas(deltas)) => {
            for delta in deltas {
                if tx.send(Ok(delta)).await.is_err() {
                    // Receiver dropped — stop reading upstream.
                    return LineOutcome::Stop;
                }
            }
            LineOutcome::Continue
        }
        Err(e) => {
            // One malformed line poisons the whole stream.
            let _ = tx.send(Err(e)).await;
            LineOutcome::Stop
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}
