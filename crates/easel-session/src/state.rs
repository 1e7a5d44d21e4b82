//! Session state and phase machine
//!
//! `idle -> streaming -> reconciling -> idle` on success,
//! `streaming -> errored -> idle` on failure, and
//! `idle -> switching-thread -> idle` when loading a different thread.
//! Saves and render-sync are suppressed outside `Idle`.

use crate::error::EngineError;
use easel_artifact::Artifact;
use easel_chat::MessageList;
use easel_store::{SaveFingerprint, StateSnapshot};
use std::collections::HashSet;

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Quiescent; input enabled, saves allowed
    Idle,
    /// A generation stream is being consumed
    Streaming,
    /// Stream finished; final reconciliation in progress
    Reconciling,
    /// Stream terminated on a reported error
    Errored,
    /// A different thread is being loaded
    SwitchingThread,
}

/// Phases reachable from `from`
#[must_use]
pub fn allowed_transitions(from: SessionPhase) -> &'static [SessionPhase] {
    use SessionPhase::*;
    match from {
        Idle => &[Streaming, SwitchingThread],
        Streaming => &[Reconciling, Errored],
        Reconciling => &[Idle, Errored],
        Errored => &[Idle],
        SwitchingThread => &[Idle],
    }
}

fn allowed(from: SessionPhase, to: SessionPhase) -> bool {
    allowed_transitions(from).contains(&to)
}

/// In-memory session state
///
/// Owned exclusively by the engine; the durable store is a mirror and is
/// never the source of truth while a stream is active.
#[derive(Debug)]
pub struct SessionState {
    /// Thread this session renders
    pub thread_id: String,
    /// Bumped on every thread switch; stale async results are discarded
    pub epoch: u64,
    /// Current lifecycle phase
    pub phase: SessionPhase,
    /// Artifact under edit, if one exists yet
    pub artifact: Option<Artifact>,
    /// Transcript
    pub messages: MessageList,
    /// Derived thread title, once enrichment produced one
    pub thread_title: Option<String>,
    /// Ids of human messages rendered optimistically before the stream
    pub optimistic_human_ids: HashSet<String>,
    /// Fingerprint of the last successful save
    pub last_saved: Option<SaveFingerprint>,
    /// A save failed and has not been superseded by a successful one
    pub save_failed: bool,
    /// Last surfaced error, for the presentation layer
    pub reported_error: Option<String>,
    /// Transcript crossed the summarization watermark
    pub needs_summarization: bool,
}

impl SessionState {
    /// Fresh state for a thread
    #[must_use]
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            epoch: 0,
            phase: SessionPhase::Idle,
            artifact: None,
            messages: MessageList::new(),
            thread_title: None,
            optimistic_human_ids: HashSet::new(),
            last_saved: None,
            save_failed: false,
            reported_error: None,
            needs_summarization: false,
        }
    }

    /// Move to a new phase
    ///
    /// # Errors
    /// [`EngineError::IllegalTransition`] when the phase machine forbids
    /// the move; the phase is left unchanged.
    pub fn transition(&mut self, to: SessionPhase) -> Result<(), EngineError> {
        if !allowed(self.phase, to) {
            return Err(EngineError::IllegalTransition {
                from: self.phase,
                to,
            });
        }
        tracing::debug!(from = ?self.phase, to = ?to, "session phase transition");
        self.phase = to;
        Ok(())
    }

    /// Is a stream being consumed right now?
    #[inline]
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.phase == SessionPhase::Streaming
    }

    /// Are saves currently suppressed?
    #[inline]
    #[must_use]
    pub fn saves_suppressed(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Streaming | SessionPhase::SwitchingThread
        )
    }

    /// Snapshot the persistable parts of this state
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::new(
            self.thread_id.clone(),
            self.messages.as_slice().to_vec(),
            self.artifact.clone(),
        )
    }

    /// Reset everything thread-scoped, keeping the epoch
    pub(crate) fn reset_for_thread(&mut self, thread_id: String) {
        self.thread_id = thread_id;
        self.artifact = None;
        self.messages.clear();
        self.thread_title = None;
        self.optimistic_human_ids.clear();
        self.last_saved = None;
        self.save_failed = false;
        self.reported_error = None;
        self.needs_summarization = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        let mut state = SessionState::new("t1");
        state.transition(SessionPhase::Streaming).unwrap();
        state.transition(SessionPhase::Reconciling).unwrap();
        state.transition(SessionPhase::Idle).unwrap();
    }

    #[test]
    fn error_path_transitions() {
        let mut state = SessionState::new("t1");
        state.transition(SessionPhase::Streaming).unwrap();
        state.transition(SessionPhase::Errored).unwrap();
        state.transition(SessionPhase::Idle).unwrap();
    }

    #[test]
    fn illegal_transition_is_rejected_and_phase_kept() {
        let mut state = SessionState::new("t1");
        let err = state.transition(SessionPhase::Reconciling).unwrap_err();
        assert!(matches!(err, EngineError::IllegalTransition { .. }));
        assert_eq!(state.phase, SessionPhase::Idle);
    }

    #[test]
    fn saves_suppressed_while_streaming_or_switching() {
        let mut state = SessionState::new("t1");
        assert!(!state.saves_suppressed());
        state.transition(SessionPhase::Streaming).unwrap();
        assert!(state.saves_suppressed());
        state.transition(SessionPhase::Reconciling).unwrap();
        assert!(!state.saves_suppressed());
        state.transition(SessionPhase::Idle).unwrap();
        state.transition(SessionPhase::SwitchingThread).unwrap();
        assert!(state.saves_suppressed());
    }
}
