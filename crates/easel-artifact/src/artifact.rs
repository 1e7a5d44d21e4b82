//! Versioned artifact store
//!
//! Holds every loaded content version plus knowledge of versions that exist
//! server-side but have not been fetched yet. The current-pointer always
//! references a loaded version; selection of an unloaded one goes through
//! the store layer first.

use crate::version::{ArtifactKind, ArtifactVersion};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Errors from artifact mutation
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Replace-in-place attempted with no versions loaded
    #[error("artifact has no loaded versions")]
    Empty,

    /// Referenced version is not loaded locally
    #[error("version {index} is not loaded")]
    NotLoaded {
        /// Requested index
        index: u32,
    },

    /// Increment variant disagrees with the artifact's variant
    #[error("artifact is {expected}, increment is {actual}")]
    KindMismatch {
        /// Variant of the existing artifact
        expected: ArtifactKind,
        /// Variant of the rejected increment
        actual: ArtifactKind,
    },
}

/// Derived view of the known version space
///
/// Recomputed on demand; `total` may exceed `known.len()` when the server
/// reports versions that were never listed individually.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMetadata {
    /// Sorted indices known to exist (loaded or listed)
    pub known: Vec<u32>,
    /// Best-known total version count
    pub total: usize,
    /// Smallest known index
    pub min: Option<u32>,
    /// Largest known index
    pub max: Option<u32>,
}

/// The document/code object under edit, with version history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ArtifactWire", into = "ArtifactWire")]
pub struct Artifact {
    current_index: u32,
    contents: BTreeMap<u32, ArtifactVersion>,
    /// Indices the server listed but we have not fetched
    listed: BTreeSet<u32>,
    /// Server-reported total, if a listing ever arrived
    server_total: usize,
}

impl Artifact {
    /// Create an artifact from its first version
    ///
    /// A zero index is normalized to 1; indices are positive by contract.
    #[must_use]
    pub fn new(first: ArtifactVersion) -> Self {
        let index = first.index().max(1);
        let mut contents = BTreeMap::new();
        contents.insert(index, first.with_index(index));
        Self {
            current_index: index,
            contents,
            listed: BTreeSet::new(),
            server_total: 0,
        }
    }

    /// Currently selected version, if loaded
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<&ArtifactVersion> {
        self.contents.get(&self.current_index)
    }

    /// Version at an index, if loaded
    #[inline]
    #[must_use]
    pub fn version(&self, index: u32) -> Option<&ArtifactVersion> {
        self.contents.get(&index)
    }

    /// Current-pointer value
    #[inline]
    #[must_use]
    pub fn current_index(&self) -> u32 {
        self.current_index
    }

    /// Number of loaded versions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    /// True when nothing is loaded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Variant tag shared by every loaded version
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<ArtifactKind> {
        self.contents.values().next().map(ArtifactVersion::kind)
    }

    /// Is the version at `index` loaded locally?
    #[inline]
    #[must_use]
    pub fn is_loaded(&self, index: u32) -> bool {
        self.contents.contains_key(&index)
    }

    /// Largest index known to exist, loaded or listed
    #[must_use]
    pub fn max_index(&self) -> u32 {
        let loaded = self.contents.keys().next_back().copied().unwrap_or(0);
        let listed = self.listed.iter().next_back().copied().unwrap_or(0);
        loaded.max(listed)
    }

    /// Merge a fetched version into the store
    ///
    /// Does not move the current-pointer; selection is a separate step.
    pub fn insert_version(&mut self, version: ArtifactVersion) {
        let index = version.index();
        self.listed.remove(&index);
        self.contents.insert(index, version);
    }

    /// Point the artifact at an already-loaded version
    ///
    /// # Errors
    /// [`ArtifactError::NotLoaded`] when the version is absent; the
    /// current-pointer is left unchanged.
    pub fn set_current(&mut self, index: u32) -> Result<(), ArtifactError> {
        if !self.contents.contains_key(&index) {
            return Err(ArtifactError::NotLoaded { index });
        }
        self.current_index = index;
        Ok(())
    }

    /// Apply one streamed increment
    ///
    /// First token of a run: append a new version at `max(known) + 1` and
    /// move the current-pointer to it. The incoming index is treated as a
    /// guess and corrected when it disagrees. Any other token: replace the
    /// content of the current version in place, never append.
    ///
    /// # Errors
    /// - [`ArtifactError::KindMismatch`] when the increment's variant
    ///   disagrees with the artifact's
    /// - [`ArtifactError::Empty`] on replace with no loaded versions
    ///
    /// Either way the store is left exactly as it was.
    pub fn apply_increment(
        &mut self,
        incoming: ArtifactVersion,
        first_token: bool,
    ) -> Result<u32, ArtifactError> {
        if let Some(expected) = self.kind() {
            if expected != incoming.kind() {
                return Err(ArtifactError::KindMismatch {
                    expected,
                    actual: incoming.kind(),
                });
            }
        }

        if first_token {
            let assigned = self.max_index() + 1;
            if incoming.index() != 0 && incoming.index() != assigned {
                tracing::debug!(
                    guessed = incoming.index(),
                    assigned,
                    "correcting guessed version index"
                );
            }
            self.contents.insert(assigned, incoming.with_index(assigned));
            self.current_index = assigned;
            return Ok(assigned);
        }

        let current = self
            .contents
            .get_mut(&self.current_index)
            .ok_or(ArtifactError::Empty)?;
        current.set_content(incoming.content());
        if !incoming.title().is_empty() && incoming.title() != current.title() {
            current.set_title(incoming.title());
        }
        Ok(self.current_index)
    }

    /// Record a server listing of existing indices and the total count
    pub fn record_listing(&mut self, indices: &[u32], total: usize) {
        for &index in indices {
            if !self.contents.contains_key(&index) {
                self.listed.insert(index);
            }
        }
        self.server_total = self.server_total.max(total);
    }

    /// Recompute the derived version metadata
    #[must_use]
    pub fn metadata(&self) -> VersionMetadata {
        let known: Vec<u32> = self
            .contents
            .keys()
            .copied()
            .chain(self.listed.iter().copied())
            .collect::<BTreeSet<u32>>()
            .into_iter()
            .collect();
        VersionMetadata {
            total: self.server_total.max(known.len()),
            min: known.first().copied(),
            max: known.last().copied(),
            known,
        }
    }
}

/// Wire shape: `{currentIndex, contents: [...]}`, order irrelevant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactWire {
    current_index: u32,
    contents: Vec<ArtifactVersion>,
}

impl From<ArtifactWire> for Artifact {
    fn from(wire: ArtifactWire) -> Self {
        let contents: BTreeMap<u32, ArtifactVersion> = wire
            .contents
            .into_iter()
            .map(|v| (v.index(), v))
            .collect();
        Self {
            current_index: wire.current_index,
            contents,
            listed: BTreeSet::new(),
            server_total: 0,
        }
    }
}

impl From<Artifact> for ArtifactWire {
    fn from(artifact: Artifact) -> Self {
        Self {
            current_index: artifact.current_index,
            contents: artifact.contents.into_values().collect(),
        }
    }
}
