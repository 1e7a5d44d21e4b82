//! Easel stream layer
//!
//! Normalizes raw generation-service frames into typed events and
//! accumulates streamed content fragments per logical operation.
//!
//! # Core Concepts
//!
//! - [`StreamEvent`]: one normalized event (phase, node, run id, payload)
//! - [`Operation`]: what a node is doing to the session (create, rewrite, patch, ...)
//! - [`Demuxer`]: classifies events, tracks run identity and first tokens
//! - [`Accumulator`]: merges text fragments into whole-content snapshots
//! - [`parse_partial`]: best-effort parser for partially streamed JSON
//!
//! Raw frames never leave this crate: downstream code only sees the tagged
//! types defined here.

#![warn(unreachable_pub)]

mod accum;
mod demux;
mod event;
mod op;
mod partial_json;

pub use accum::{extract_json_delta, extract_text, extract_thinking, Accumulator, HighlightSpan};
pub use demux::{DemuxedEvent, Demuxer, RunTag, PENDING_RUN_KEY};
pub use event::{Frame, FrameError, Phase, StreamEvent};
pub use op::Operation;
pub use partial_json::{parse_partial, repair, ParseOutcome};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
