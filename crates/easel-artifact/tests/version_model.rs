//! Version-model invariants over whole increment sequences

use easel_artifact::{navigate, Artifact, ArtifactVersion};
use proptest::prelude::*;

fn text(content: &str) -> ArtifactVersion {
    ArtifactVersion::text(0, "Doc", content)
}

#[test]
fn version_count_tracks_first_token_increments() {
    let mut artifact = Artifact::new(ArtifactVersion::text(1, "Doc", "a"));
    // one run streaming in place, then a second run
    artifact.apply_increment(text("ab"), false).unwrap();
    artifact.apply_increment(text("abc"), false).unwrap();
    artifact.apply_increment(text("x"), true).unwrap();
    artifact.apply_increment(text("xy"), false).unwrap();
    assert_eq!(artifact.len(), 2);
    assert_eq!(artifact.current().unwrap().content(), "xy");
}

#[test]
fn navigation_over_sparse_history() {
    let mut artifact = Artifact::new(ArtifactVersion::text(1, "Doc", "v1"));
    artifact.record_listing(&[1, 3, 5], 3);
    let meta = artifact.metadata();

    let at_three = navigate(&meta, 3, false);
    assert_eq!(at_three.previous, Some(1));
    assert_eq!(at_three.next, Some(5));

    let at_four = navigate(&meta, 4, false);
    assert_eq!(at_four.previous, Some(3));
}

proptest! {
    /// contents length == number of first-token increments, never more
    #[test]
    fn contents_len_equals_first_token_count(
        increments in proptest::collection::vec(
            (any::<bool>(), "[a-z]{1,12}"),
            1..40,
        )
    ) {
        let mut artifact: Option<Artifact> = None;
        let mut first_tokens = 0usize;

        for (mut first, content) in increments {
            if artifact.is_none() {
                // a stream cannot replace before anything exists
                first = true;
            }
            if first {
                first_tokens += 1;
            }
            match artifact.as_mut() {
                None => artifact = Some(Artifact::new(ArtifactVersion::text(1, "Doc", content))),
                Some(a) => {
                    a.apply_increment(text(&content), first).unwrap();
                }
            }
        }

        let artifact = artifact.unwrap();
        prop_assert_eq!(artifact.len(), first_tokens);
        // the pointer always lands on a loaded version
        prop_assert!(artifact.current().is_some());
        // indices are unique positive integers
        let meta = artifact.metadata();
        prop_assert!(meta.known.iter().all(|&i| i >= 1));
    }

    /// replace-in-place never grows the version set
    #[test]
    fn replace_never_appends(contents in proptest::collection::vec("[a-z]{1,8}", 1..20)) {
        let mut artifact = Artifact::new(ArtifactVersion::text(1, "Doc", "seed"));
        for content in &contents {
            artifact.apply_increment(text(content), false).unwrap();
        }
        prop_assert_eq!(artifact.len(), 1);
        prop_assert_eq!(artifact.current().unwrap().content(), contents.last().unwrap().as_str());
    }
}
