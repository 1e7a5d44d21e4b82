//! Engine configuration

use std::time::Duration;

/// Session engine tunables
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Debounce window for persistence; restarts on every new mutation
    pub save_debounce: Duration,
    /// Common-prefix length at which an assistant message counts as an
    /// echo of the artifact. Heuristic, not a hard contract.
    pub artifact_echo_prefix_len: usize,
    /// Transcript char count past which summarization is signalled
    pub transcript_char_ceiling: usize,
    /// Derive a thread title in the background after the first exchange
    pub title_enrichment: bool,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a save debounce window
    #[inline]
    #[must_use]
    pub fn with_save_debounce(mut self, debounce: Duration) -> Self {
        self.save_debounce = debounce;
        self
    }

    /// With an artifact-echo prefix threshold
    #[inline]
    #[must_use]
    pub fn with_echo_prefix_len(mut self, len: usize) -> Self {
        self.artifact_echo_prefix_len = len;
        self
    }

    /// With a transcript watermark
    #[inline]
    #[must_use]
    pub fn with_transcript_ceiling(mut self, chars: usize) -> Self {
        self.transcript_char_ceiling = chars;
        self
    }

    /// Enable or disable background title enrichment
    #[inline]
    #[must_use]
    pub fn with_title_enrichment(mut self, enabled: bool) -> Self {
        self.title_enrichment = enabled;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            save_debounce: Duration::from_millis(600),
            artifact_echo_prefix_len: 100,
            transcript_char_ceiling: 300_000,
            title_enrichment: true,
        }
    }
}
