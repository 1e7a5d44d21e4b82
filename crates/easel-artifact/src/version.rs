//! Content version variants
//!
//! Wire format matches the upstream service: a tagged object with camelCase
//! fields (`{"type": "text", "index": 1, "title": ..., "fullMarkdown": ...}`).

use serde::{Deserialize, Serialize};

/// Variant tag of an artifact
///
/// All versions of one artifact share a tag for its lifetime; a type change
/// is treated as a logically new artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactKind {
    /// Markdown document
    Text,
    /// Source code file
    Code,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Code => write!(f, "code"),
        }
    }
}

/// One immutable content snapshot at a version index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ArtifactVersion {
    /// Markdown document version
    #[serde(rename_all = "camelCase")]
    Text {
        /// Version index, unique and positive
        index: u32,
        /// Human-readable title
        title: String,
        /// Full markdown body
        full_markdown: String,
    },
    /// Code file version
    #[serde(rename_all = "camelCase")]
    Code {
        /// Version index, unique and positive
        index: u32,
        /// Human-readable title
        title: String,
        /// Language identifier (e.g. `python`)
        language: String,
        /// Full source text
        code: String,
    },
}

impl ArtifactVersion {
    /// Build a text version
    #[must_use]
    pub fn text(index: u32, title: impl Into<String>, full_markdown: impl Into<String>) -> Self {
        Self::Text {
            index,
            title: title.into(),
            full_markdown: full_markdown.into(),
        }
    }

    /// Build a code version
    #[must_use]
    pub fn code(
        index: u32,
        title: impl Into<String>,
        language: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self::Code {
            index,
            title: title.into(),
            language: language.into(),
            code: code.into(),
        }
    }

    /// Version index
    #[inline]
    #[must_use]
    pub fn index(&self) -> u32 {
        match self {
            Self::Text { index, .. } | Self::Code { index, .. } => *index,
        }
    }

    /// Variant tag
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Text { .. } => ArtifactKind::Text,
            Self::Code { .. } => ArtifactKind::Code,
        }
    }

    /// Title
    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Text { title, .. } | Self::Code { title, .. } => title,
        }
    }

    /// Content body, regardless of variant
    #[inline]
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Text { full_markdown, .. } => full_markdown,
            Self::Code { code, .. } => code,
        }
    }

    /// Language, for code versions
    #[inline]
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        match self {
            Self::Code { language, .. } => Some(language),
            Self::Text { .. } => None,
        }
    }

    /// Same version renumbered to a different index
    #[must_use]
    pub fn with_index(mut self, new_index: u32) -> Self {
        match &mut self {
            Self::Text { index, .. } | Self::Code { index, .. } => *index = new_index,
        }
        self
    }

    /// Replace the content body in place, keeping the variant
    pub fn set_content(&mut self, content: impl Into<String>) {
        match self {
            Self::Text { full_markdown, .. } => *full_markdown = content.into(),
            Self::Code { code, .. } => *code = content.into(),
        }
    }

    /// Replace the title in place
    pub fn set_title(&mut self, title: impl Into<String>) {
        match self {
            Self::Text { title: t, .. } | Self::Code { title: t, .. } => *t = title.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_format_is_camel_case_tagged() {
        let v = ArtifactVersion::text(1, "Poem", "Roses are red");
        let wire = serde_json::to_value(&v).unwrap();
        assert_eq!(
            wire,
            json!({"type": "text", "index": 1, "title": "Poem", "fullMarkdown": "Roses are red"})
        );
    }

    #[test]
    fn code_round_trips() {
        let v = ArtifactVersion::code(2, "Script", "python", "print('hi')");
        let wire = serde_json::to_string(&v).unwrap();
        let back: ArtifactVersion = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, v);
        assert_eq!(back.language(), Some("python"));
    }

    #[test]
    fn accessors_cover_both_variants() {
        let t = ArtifactVersion::text(3, "T", "body");
        let c = ArtifactVersion::code(4, "C", "rust", "fn main() {}");
        assert_eq!(t.kind(), ArtifactKind::Text);
        assert_eq!(c.kind(), ArtifactKind::Code);
        assert_eq!(t.content(), "body");
        assert_eq!(c.content(), "fn main() {}");
        assert_eq!(t.language(), None);
    }

    #[test]
    fn renumber_and_replace() {
        let mut v = ArtifactVersion::text(1, "T", "old").with_index(7);
        assert_eq!(v.index(), 7);
        v.set_content("new");
        assert_eq!(v.content(), "new");
    }
}
