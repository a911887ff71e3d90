//! Chat orchestration and streaming relay.
//!
//! The [`ChatEngine`] runs one chat turn end to end: assemble retrieval
//! context, mutate history, open the upstream stream, and relay decoded
//! deltas to the caller as live events. The relay itself is a small state
//! machine (`relay` module) that also owns the all-or-nothing commit of
//! the finished assistant turn.

mod engine;
mod relay;

pub use engine::ChatEngine;
