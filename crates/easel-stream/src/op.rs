//! Operation classification
//!
//! Maps the wire node names declared by the generation service onto the
//! closed set of operations this engine understands. The routing decision
//! itself is upstream; by the time a frame arrives the node name is final.

/// What a stream event is doing to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Produce a brand-new artifact
    CreateArtifact,
    /// Replace the whole artifact content
    RewriteArtifact,
    /// Regenerate a highlighted span of a code artifact
    PatchCode,
    /// Regenerate a highlighted span of a text artifact
    PatchText,
    /// Whole-artifact stylistic rewrite (reading level, comments, ...)
    StyleRewrite,
    /// Conversational reply, no artifact mutation
    Reply,
    /// Short follow-up message after an artifact operation
    Followup,
    /// Web search run
    WebSearch,
    /// Background enrichment (title, summarization, reflection, routing)
    Enrichment,
}

impl Operation {
    /// Classify a wire node name
    ///
    /// Returns `None` for nodes this engine does not consume; callers skip
    /// those events.
    #[must_use]
    pub fn from_node(node: &str) -> Option<Self> {
        match node {
            "generateArtifact" => Some(Self::CreateArtifact),
            "rewriteArtifact" => Some(Self::RewriteArtifact),
            "updateArtifact" => Some(Self::PatchCode),
            "updateHighlightedText" => Some(Self::PatchText),
            "rewriteArtifactTheme" | "rewriteCodeArtifactTheme" | "customAction" => {
                Some(Self::StyleRewrite)
            }
            "replyToGeneralInput" => Some(Self::Reply),
            "generateFollowup" => Some(Self::Followup),
            "webSearch" => Some(Self::WebSearch),
            "generatePath" | "routePostWebSearch" | "generateTitle" | "summarizer"
            | "reflect" | "cleanState" => Some(Self::Enrichment),
            _ => None,
        }
    }

    /// Does this operation write artifact content?
    #[inline]
    #[must_use]
    pub fn writes_artifact(&self) -> bool {
        matches!(
            self,
            Self::CreateArtifact
                | Self::RewriteArtifact
                | Self::PatchCode
                | Self::PatchText
                | Self::StyleRewrite
        )
    }

    /// Does this operation splice into a highlighted span?
    #[inline]
    #[must_use]
    pub fn is_scoped_patch(&self) -> bool {
        matches!(self, Self::PatchCode | Self::PatchText)
    }

    /// Does the start of this operation warrant a search placeholder message?
    #[inline]
    #[must_use]
    pub fn triggers_search(&self) -> bool {
        matches!(self, Self::WebSearch)
    }

    /// Does this operation stream conversational content?
    #[inline]
    #[must_use]
    pub fn is_chat(&self) -> bool {
        matches!(self, Self::Reply | Self::Followup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_artifact_nodes() {
        assert_eq!(
            Operation::from_node("generateArtifact"),
            Some(Operation::CreateArtifact)
        );
        assert_eq!(
            Operation::from_node("updateHighlightedText"),
            Some(Operation::PatchText)
        );
        assert_eq!(
            Operation::from_node("customAction"),
            Some(Operation::StyleRewrite)
        );
    }

    #[test]
    fn unknown_node_is_skipped() {
        assert_eq!(Operation::from_node("somethingElse"), None);
    }

    #[test]
    fn predicates_are_disjoint_where_expected() {
        for op in [
            Operation::CreateArtifact,
            Operation::RewriteArtifact,
            Operation::PatchCode,
            Operation::PatchText,
            Operation::StyleRewrite,
        ] {
            assert!(op.writes_artifact());
            assert!(!op.is_chat());
        }
        assert!(Operation::Reply.is_chat());
        assert!(!Operation::Reply.writes_artifact());
        assert!(Operation::WebSearch.triggers_search());
    }

    #[test]
    fn only_patches_are_scoped() {
        assert!(Operation::PatchCode.is_scoped_patch());
        assert!(Operation::PatchText.is_scoped_patch());
        assert!(!Operation::RewriteArtifact.is_scoped_patch());
    }
}
