//! Easel chat transcript
//!
//! The ordered message list shown beside the artifact, and the rules for
//! keeping it consistent while a stream is feeding it:
//!
//! - [`Message`]: transcript entry (human, assistant, thinking, search
//!   placeholder, node progress)
//! - [`MessageList`]: identity-keyed upsert, placeholder re-keying, and
//!   end-of-stream reconciliation

#![warn(unreachable_pub)]

mod message;
mod reconcile;

pub use message::{Message, MessageBody, PENDING_RUN_KEY};
pub use reconcile::MessageList;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
