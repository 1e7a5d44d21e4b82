//! Easel session engine
//!
//! The component that owns a live session: it consumes the generation
//! stream event by event, applies every increment to the in-memory
//! transcript and artifact, reconciles the result with the durable store,
//! and exposes the views the presentation layer renders from.
//!
//! # Core Concepts
//!
//! - [`SessionEngine`]: the presentation surface and reducer driver
//! - [`SessionState`] / [`SessionPhase`]: explicit session state, no
//!   ambient globals; all mutation goes through the engine's contracts
//! - [`RunContext`]: per-run inputs (highlighted span, artifact kind hint)
//! - [`EngineConfig`]: tunables (debounce, echo threshold, watermark)
//!
//! Execution is cooperative: the stream is consumed by sequential
//! asynchronous iteration and every event is fully applied before the next
//! is read. Version fetches and enrichment run as independent tasks whose
//! results are discarded if the session context changes under them.

#![warn(unreachable_pub)]

mod config;
mod engine;
mod enrich;
mod error;
mod persist;
mod reducer;
mod state;

pub use config::EngineConfig;
pub use engine::{DiffView, SessionEngine};
pub use error::EngineError;
pub use reducer::RunContext;
pub use state::{allowed_transitions, SessionPhase, SessionState};

// the span type callers need to build a scoped-patch RunContext
pub use easel_stream::HighlightSpan;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
