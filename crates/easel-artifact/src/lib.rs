//! Easel artifact model
//!
//! The versioned document/code object under edit.
//!
//! # Core Concepts
//!
//! - [`ArtifactVersion`]: one immutable content snapshot, text or code
//! - [`Artifact`]: version store with a current-pointer; indices are unique
//!   positive integers but need not be contiguous (versions load lazily)
//! - [`VersionMetadata`]: derived view of what is known to exist
//! - [`navigate`]: previous/next resolution over the known-index set
//!
//! Increments are atomic: a failed application leaves the store untouched.

#![warn(unreachable_pub)]

mod artifact;
mod navigation;
mod version;

pub use artifact::{Artifact, ArtifactError, VersionMetadata};
pub use navigation::{navigate, Navigation};
pub use version::{ArtifactKind, ArtifactVersion};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
