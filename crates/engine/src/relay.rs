//! The stream relay state machine.
//!
//! Per request: `OPEN → (STREAMING)* → {COMPLETE | FAILED}`. The relay
//! consumes decoded deltas, forwards each one downstream immediately in
//! arrival order, and accumulates the full turn. Only a COMPLETE run
//! commits the assistant turn to history — a failed or abandoned stream
//! leaves history without it.

use std::sync::Arc;

use sibyl_core::error::UpstreamError;
use sibyl_core::history::HistoryStore;
use sibyl_core::message::Turn;
use sibyl_core::stream::{DeltaKind, RelayEvent, StreamDelta};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Terminal state of one relay run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RelayOutcome {
    /// Upstream ended cleanly; the assistant turn was committed.
    Complete,
    /// The stream or the caller failed; nothing was committed.
    Failed,
}

/// Drive one stream to its terminal state.
///
/// Dropping `deltas` on early return is what cancels the upstream read:
/// the decode task notices its receiver is gone and releases the
/// connection.
pub(crate) async fn run(
    mut deltas: mpsc::Receiver<Result<StreamDelta, UpstreamError>>,
    events: mpsc::Sender<RelayEvent>,
    history: Arc<HistoryStore>,
) -> RelayOutcome {
    let mut reasoning = String::new();
    let mut answer = String::new();

    while let Some(item) = deltas.recv().await {
        match item {
            Ok(delta) => {
                match delta.kind {
                    DeltaKind::Reasoning => reasoning.push_str(&delta.text),
                    DeltaKind::Answer => answer.push_str(&delta.text),
                }

                // Forward the chunk (not the accumulator), immediately.
                if events.send(RelayEvent::from(delta)).await.is_err() {
                    warn!("Caller disconnected mid-stream, abandoning turn");
                    return RelayOutcome::Failed;
                }
            }
            Err(e) => {
                warn!(error = %e, "Upstream stream failed, abandoning turn");
                let _ = events
                    .send(RelayEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                return RelayOutcome::Failed;
            }
        }
    }

    // Clean end: commit the whole turn at once.
    let reasoning = if reasoning.is_empty() {
        None
    } else {
        Some(reasoning)
    };
    history.append(Turn::assistant(answer, reasoning));
    debug!("Assistant turn committed to history");
    RelayOutcome::Complete
}

#[cfg(test)]
mod tests {
    use super::*;
    use sibyl_core::message::Role;

    async fn feed(
        items: Vec<Result<StreamDelta, UpstreamError>>,
    ) -> mpsc::Receiver<Result<StreamDelta, UpstreamError>> {
        let (tx, rx) = mpsc::channel(16);
        for item in items {
            tx.send(item).await.unwrap();
        }
        rx
    }

    async fn drain(mut rx: mpsc::Receiver<RelayEvent>) -> Vec<RelayEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn events_preserve_delta_order_across_channels() {
        let deltas = feed(vec![
            Ok(StreamDelta::reasoning("a")),
            Ok(StreamDelta::reasoning("b")),
            Ok(StreamDelta::answer("x")),
            Ok(StreamDelta::answer("y")),
        ])
        .await;

        let history = Arc::new(HistoryStore::new(10));
        let (tx, rx) = mpsc::channel(16);
        let outcome = run(deltas, tx, history.clone()).await;

        assert_eq!(outcome, RelayOutcome::Complete);
        let events = drain(rx).await;
        assert_eq!(
            events,
            vec![
                RelayEvent::Reasoning {
                    reasoning_content: "a".into()
                },
                RelayEvent::Reasoning {
                    reasoning_content: "b".into()
                },
                RelayEvent::Answer { content: "x".into() },
                RelayEvent::Answer { content: "y".into() },
            ]
        );
    }

    #[tokio::test]
    async fn complete_run_commits_accumulated_turn() {
        let deltas = feed(vec![
            Ok(StreamDelta::reasoning("th")),
            Ok(StreamDelta::reasoning("ink")),
            Ok(StreamDelta::answer("ans")),
            Ok(StreamDelta::answer("wer")),
        ])
        .await;

        let history = Arc::new(HistoryStore::new(10));
        let (tx, _rx) = mpsc::channel(16);
        run(deltas, tx, history.clone()).await;

        let snap = history.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].role, Role::Assistant);
        assert_eq!(snap[0].content, "answer");
        assert_eq!(snap[0].reasoning.as_deref(), Some("think"));
    }

    #[tokio::test]
    async fn empty_reasoning_commits_as_none() {
        let deltas = feed(vec![Ok(StreamDelta::answer("plain"))]).await;
        let history = Arc::new(HistoryStore::new(10));
        let (tx, _rx) = mpsc::channel(16);
        run(deltas, tx, history.clone()).await;

        let snap = history.snapshot();
        assert_eq!(snap[0].content, "plain");
        assert!(snap[0].reasoning.is_none());
    }

    #[tokio::test]
    async fn upstream_failure_commits_nothing() {
        let deltas = feed(vec![
            Ok(StreamDelta::answer("x")),
            Err(UpstreamError::Interrupted("connection reset".into())),
        ])
        .await;

        let history = Arc::new(HistoryStore::new(10));
        let (tx, rx) = mpsc::channel(16);
        let outcome = run(deltas, tx, history.clone()).await;

        assert_eq!(outcome, RelayOutcome::Failed);
        assert!(history.is_empty());

        let events = drain(rx).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], RelayEvent::Answer { content: "x".into() });
        assert_eq!(events[1].channel(), "error");
    }

    #[tokio::test]
    async fn disconnected_caller_stops_relay_without_commit() {
        let deltas = feed(vec![
            Ok(StreamDelta::answer("x")),
            Ok(StreamDelta::answer("y")),
        ])
        .await;

        let history = Arc::new(HistoryStore::new(10));
        let (tx, rx) = mpsc::channel(16);
        drop(rx);

        let outcome = run(deltas, tx, history.clone()).await;
        assert_eq!(outcome, RelayOutcome::Failed);
        assert!(history.is_empty());
    }
}
