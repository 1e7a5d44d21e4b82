//! Easel diff engine
//!
//! Character-level LCS diff between two artifact versions, with a semantic
//! cleanup pass that folds short common fragments into their neighboring
//! edits so the rendered diff reads as words, not confetti.
//!
//! The engine only compares like with like: text against text, code
//! against code. Variant disagreement is a [`DiffError::TypeMismatch`],
//! not a best-effort diff.

#![warn(unreachable_pub)]

use easel_artifact::{ArtifactKind, ArtifactVersion};
use similar::{ChangeTag, TextDiff};

/// Default cleanup threshold: common runs shorter than this fold away
pub const DEFAULT_CLEANUP_THRESHOLD: usize = 4;

/// Diff operation for one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOp {
    /// Present in both versions
    Unchanged,
    /// Present only in the base
    Deleted,
    /// Present only in the target
    Inserted,
}

/// One maximal run of a single operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSegment {
    /// Operation
    pub op: DiffOp,
    /// Segment text; blanked on the opposite side of a split
    pub text: String,
}

impl DiffSegment {
    fn new(op: DiffOp, text: impl Into<String>) -> Self {
        Self {
            op,
            text: text.into(),
        }
    }
}

/// Errors from the diff engine
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// Versions of different variants cannot be compared
    #[error("cannot diff {base} version against {target} version")]
    TypeMismatch {
        /// Variant of the base version
        base: ArtifactKind,
        /// Variant of the target version
        target: ArtifactKind,
    },
}

/// Diff two versions of the same artifact
///
/// # Errors
/// [`DiffError::TypeMismatch`] when the variants disagree; no diff is
/// produced.
pub fn diff_versions(
    base: &ArtifactVersion,
    target: &ArtifactVersion,
) -> Result<Vec<DiffSegment>, DiffError> {
    if base.kind() != target.kind() {
        return Err(DiffError::TypeMismatch {
            base: base.kind(),
            target: target.kind(),
        });
    }
    Ok(diff_text(base.content(), target.content()))
}

/// Char-level diff with the default semantic cleanup
#[must_use]
pub fn diff_text(base: &str, target: &str) -> Vec<DiffSegment> {
    diff_text_with_threshold(base, target, DEFAULT_CLEANUP_THRESHOLD)
}

/// Char-level diff with an explicit cleanup threshold
#[must_use]
pub fn diff_text_with_threshold(base: &str, target: &str, threshold: usize) -> Vec<DiffSegment> {
    let diff = TextDiff::from_chars(base, target);

    let mut segments: Vec<DiffSegment> = Vec::new();
    for change in diff.iter_all_changes() {
        let op = match change.tag() {
            ChangeTag::Equal => DiffOp::Unchanged,
            ChangeTag::Delete => DiffOp::Deleted,
            ChangeTag::Insert => DiffOp::Inserted,
        };
        match segments.last_mut() {
            Some(last) if last.op == op => last.text.push_str(change.value()),
            _ => segments.push(DiffSegment::new(op, change.value())),
        }
    }

    cleanup_semantic(segments, threshold)
}

/// Fold short common runs sandwiched between edits into those edits
///
/// A common fragment shorter than the threshold, and no longer than the
/// larger of its neighboring edit runs, carries no visual value: it is
/// re-attributed to both sides (deleted from the base, inserted into the
/// target) and the surrounding edits merge. Repeats until stable.
fn cleanup_semantic(segments: Vec<DiffSegment>, threshold: usize) -> Vec<DiffSegment> {
    let mut groups = group(segments);

    loop {
        let mut changed = false;
        let mut i = 1;
        while i + 1 < groups.len() {
            let foldable = match (&groups[i - 1], &groups[i], &groups[i + 1]) {
                (Group::Edit(before), Group::Common(text), Group::Edit(after)) => {
                    let len = text.chars().count();
                    len < threshold && len <= before.weight().max(after.weight())
                }
                _ => false,
            };
            if foldable {
                let Group::Common(text) = groups.remove(i) else {
                    unreachable!("checked above");
                };
                let Group::Edit(after) = groups.remove(i) else {
                    unreachable!("checked above");
                };
                let Group::Edit(before) = &mut groups[i - 1] else {
                    unreachable!("checked above");
                };
                before.deleted.push_str(&text);
                before.deleted.push_str(&after.deleted);
                before.inserted.push_str(&text);
                before.inserted.push_str(&after.inserted);
                changed = true;
            } else {
                i += 1;
            }
        }
        if !changed {
            break;
        }
    }

    ungroup(groups)
}

#[derive(Debug, Default)]
struct EditRun {
    deleted: String,
    inserted: String,
}

impl EditRun {
    fn weight(&self) -> usize {
        self.deleted.chars().count().max(self.inserted.chars().count())
    }
}

#[derive(Debug)]
enum Group {
    Common(String),
    Edit(EditRun),
}

fn group(segments: Vec<DiffSegment>) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    for segment in segments {
        match segment.op {
            DiffOp::Unchanged => groups.push(Group::Common(segment.text)),
            DiffOp::Deleted => match groups.last_mut() {
                Some(Group::Edit(run)) => run.deleted.push_str(&segment.text),
                _ => groups.push(Group::Edit(EditRun {
                    deleted: segment.text,
                    ..EditRun::default()
                })),
            },
            DiffOp::Inserted => match groups.last_mut() {
                Some(Group::Edit(run)) => run.inserted.push_str(&segment.text),
                _ => groups.push(Group::Edit(EditRun {
                    inserted: segment.text,
                    ..EditRun::default()
                })),
            },
        }
    }
    groups
}

fn ungroup(groups: Vec<Group>) -> Vec<DiffSegment> {
    let mut segments = Vec::new();
    for g in groups {
        match g {
            Group::Common(text) => {
                if !text.is_empty() {
                    segments.push(DiffSegment::new(DiffOp::Unchanged, text));
                }
            }
            Group::Edit(run) => {
                if !run.deleted.is_empty() {
                    segments.push(DiffSegment::new(DiffOp::Deleted, run.deleted));
                }
                if !run.inserted.is_empty() {
                    segments.push(DiffSegment::new(DiffOp::Inserted, run.inserted));
                }
            }
        }
    }
    segments
}

/// Derive the two sequences for side-by-side display
///
/// Left retains unchanged and deleted runs and blanks insertions; right
/// retains unchanged and inserted runs and blanks deletions. Blanked
/// segments keep their operation so renderers can reserve space.
#[must_use]
pub fn split_sides(segments: &[DiffSegment]) -> (Vec<DiffSegment>, Vec<DiffSegment>) {
    let left = segments
        .iter()
        .map(|s| match s.op {
            DiffOp::Inserted => DiffSegment::new(DiffOp::Inserted, ""),
            _ => s.clone(),
        })
        .collect();
    let right = segments
        .iter()
        .map(|s| match s.op {
            DiffOp::Deleted => DiffSegment::new(DiffOp::Deleted, ""),
            _ => s.clone(),
        })
        .collect();
    (left, right)
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
