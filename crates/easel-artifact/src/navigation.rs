//! Version navigation
//!
//! Previous/next resolution walks the sorted known-index set, so gaps from
//! lazily fetched history are stepped over rather than into.

use crate::artifact::VersionMetadata;

/// Navigation targets from a given index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    /// Index one step back, if backward navigation is possible
    pub previous: Option<u32>,
    /// Index one step forward, if forward navigation is possible
    pub next: Option<u32>,
}

/// Resolve previous/next for `index` over the known version set
///
/// An index absent from the known set resolves its previous neighbor to the
/// greatest known index strictly below it. Backward navigation is disabled
/// when no smaller index exists or only one version is known. In compare
/// mode forward navigation never advances past the highest known index;
/// outside compare mode, when the server reports more versions than are
/// known, the step past the top is a fetchable guess of `index + 1`.
#[must_use]
pub fn navigate(meta: &VersionMetadata, index: u32, compare_mode: bool) -> Navigation {
    let known = &meta.known;

    let previous = if known.len() <= 1 {
        None
    } else {
        known.iter().rev().find(|&&i| i < index).copied()
    };

    let mut next = known.iter().find(|&&i| i > index).copied();

    if next.is_none()
        && !compare_mode
        && meta.total > known.len()
        && meta.max.is_some_and(|max| index >= max)
    {
        next = Some(index + 1);
    }

    Navigation { previous, next }
}
