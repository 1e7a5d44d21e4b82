//! Session engine
//!
//! Owns the session state behind a lock, drives the stream reducer, and
//! exposes the surface the presentation layer calls: current artifact and
//! transcript, streaming/save flags, version selection, navigation, diff.
//!
//! Version fetches collapse per index: concurrent selection of the same
//! unloaded version subscribes to the one in-flight request instead of
//! issuing another. Results that land after a thread switch are discarded.

use crate::config::EngineConfig;
use crate::enrich;
use crate::error::EngineError;
use crate::persist::{save_once, SaveScheduler};
use crate::reducer::{Flow, RunContext, StreamRun};
use crate::state::{SessionPhase, SessionState};
use dashmap::DashMap;
use easel_artifact::{navigate, Artifact, Navigation};
use easel_chat::{Message, MessageBody};
use easel_diff::{diff_versions, split_sides, DiffSegment};
use easel_store::{StoreError, VersionStore};
use futures::{Stream, StreamExt};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

/// Computed diff plus its side-by-side projections
#[derive(Debug, Clone)]
pub struct DiffView {
    /// Full segment sequence
    pub segments: Vec<DiffSegment>,
    /// Base side: unchanged + deleted, insertions blanked
    pub left: Vec<DiffSegment>,
    /// Target side: unchanged + inserted, deletions blanked
    pub right: Vec<DiffSegment>,
}

/// Progress of an in-flight version fetch, shared with collapsed callers
#[derive(Debug, Clone, PartialEq, Eq)]
enum FetchState {
    Pending,
    Loaded,
    NotFound,
    Failed(String),
}

/// How a consumed stream ended
enum RunEnd {
    Completed,
    StreamError(String),
    Transport(String),
}

/// The session engine
///
/// Cheap to share: all methods take `&self`. Stream consumption is
/// sequential and cooperative; navigation fetches and enrichment run as
/// independent tasks guarded by the session epoch.
pub struct SessionEngine {
    state: Arc<RwLock<SessionState>>,
    store: Arc<dyn VersionStore>,
    config: EngineConfig,
    saver: SaveScheduler,
    inflight: DashMap<u32, watch::Receiver<FetchState>>,
}

impl SessionEngine {
    /// Create an engine for a thread
    #[must_use]
    pub fn new(
        store: Arc<dyn VersionStore>,
        thread_id: impl Into<String>,
        config: EngineConfig,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::new(thread_id))),
            store,
            config,
            saver: SaveScheduler::new(),
            inflight: DashMap::new(),
        }
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults(store: Arc<dyn VersionStore>, thread_id: impl Into<String>) -> Self {
        Self::new(store, thread_id, EngineConfig::default())
    }

    /// Consume one generation stream to completion
    ///
    /// Frames are applied strictly in order; each is fully processed
    /// before the next is read. Malformed frames are skipped. A stream
    /// error reported by the service terminates the run and is surfaced
    /// via [`Self::reported_error`] without raising; a transport failure
    /// additionally returns [`EngineError::Transport`]. Local state
    /// survives both.
    ///
    /// # Errors
    /// [`EngineError::IllegalTransition`] when a stream is already being
    /// consumed; [`EngineError::Transport`] on transport failure.
    pub async fn consume<S>(&self, frames: S, ctx: RunContext) -> Result<(), EngineError>
    where
        S: Stream<Item = Result<Value, StoreError>>,
    {
        self.saver.cancel();
        {
            let mut state = self.state.write();
            state.reported_error = None;
            state.transition(SessionPhase::Streaming)?;
        }

        let mut run = StreamRun::new(ctx);
        futures::pin_mut!(frames);

        let end = loop {
            let Some(item) = frames.next().await else {
                break RunEnd::Completed;
            };
            let raw = match item {
                Ok(raw) => raw,
                Err(e) => break RunEnd::Transport(e.to_string()),
            };
            let flow = {
                let mut state = self.state.write();
                run.apply(&mut state, &raw, &self.config)
            };
            match flow {
                Flow::Continue => {}
                Flow::Done => break RunEnd::Completed,
                Flow::Failed(message) => break RunEnd::StreamError(message),
            }
        };

        match end {
            RunEnd::Completed => {
                let epoch = {
                    let mut state = self.state.write();
                    state.transition(SessionPhase::Reconciling)?;
                    run.finalize(&mut state, &self.config);
                    state.transition(SessionPhase::Idle)?;
                    state.epoch
                };
                self.schedule_save();
                if self.config.title_enrichment {
                    enrich::spawn_title_enrichment(self.state.clone(), epoch);
                }
                Ok(())
            }
            RunEnd::StreamError(message) => {
                self.fail_stream(message)?;
                Ok(())
            }
            RunEnd::Transport(message) => {
                self.fail_stream(message.clone())?;
                Err(EngineError::Transport(message))
            }
        }
    }

    fn fail_stream(&self, message: String) -> Result<(), EngineError> {
        tracing::error!(error = %message, "stream terminated");
        let mut state = self.state.write();
        state.reported_error = Some(message);
        state.transition(SessionPhase::Errored)?;
        state.transition(SessionPhase::Idle)?;
        Ok(())
    }

    /// Select a version, fetching it if it is not loaded yet
    ///
    /// Re-selecting a loaded version is idempotent and performs no fetch.
    /// Concurrent requests for one index collapse into a single in-flight
    /// fetch. A version the server reports as nonexistent never becomes
    /// current: the previous selection is retained and the error reported.
    ///
    /// # Errors
    /// [`EngineError::StreamInProgress`] while a stream is writing;
    /// [`EngineError::VersionNotFound`] / [`EngineError::Transport`] on
    /// fetch failure.
    pub async fn select_version(&self, index: u32) -> Result<(), EngineError> {
        let fast = {
            let mut state = self.state.write();
            if state.is_streaming() {
                return Err(EngineError::StreamInProgress);
            }
            let Some(artifact) = state.artifact.as_mut() else {
                return Err(EngineError::VersionNotFound { index });
            };
            if artifact.is_loaded(index) {
                artifact.set_current(index)?;
                true
            } else {
                false
            }
        };
        if fast {
            self.schedule_save();
            return Ok(());
        }

        if let Some(rx) = self.inflight.get(&index).map(|entry| entry.value().clone()) {
            return self.await_inflight(index, rx).await;
        }

        let (thread_id, epoch) = {
            let state = self.state.read();
            (state.thread_id.clone(), state.epoch)
        };

        let (tx, rx) = watch::channel(FetchState::Pending);
        self.inflight.insert(index, rx);
        tracing::debug!(index, "fetching version for selection");
        let fetched = self.store.fetch_version(&thread_id, index).await;
        self.inflight.remove(&index);

        let (final_state, outcome) = {
            let mut state = self.state.write();
            if state.epoch != epoch || state.thread_id != thread_id {
                tracing::debug!(index, "discarding stale version fetch");
                (FetchState::Failed("session context changed".to_string()), Ok(()))
            } else {
                match fetched {
                    Ok(version) => match state.artifact.as_mut() {
                        Some(artifact) => {
                            artifact.insert_version(version);
                            match artifact.set_current(index) {
                                Ok(()) => (FetchState::Loaded, Ok(())),
                                Err(e) => {
                                    (FetchState::Failed(e.to_string()), Err(EngineError::from(e)))
                                }
                            }
                        }
                        None => (FetchState::Failed("artifact discarded".to_string()), Ok(())),
                    },
                    Err(StoreError::VersionNotFound { .. }) => {
                        state.reported_error = Some(format!("version {index} not found"));
                        (FetchState::NotFound, Err(EngineError::VersionNotFound { index }))
                    }
                    Err(e) => {
                        let message = e.to_string();
                        state.reported_error = Some(message.clone());
                        (FetchState::Failed(message), Err(EngineError::from(e)))
                    }
                }
            }
        };

        let _ = tx.send(final_state);
        if outcome.is_ok() {
            self.schedule_save();
        }
        outcome
    }

    async fn await_inflight(
        &self,
        index: u32,
        mut rx: watch::Receiver<FetchState>,
    ) -> Result<(), EngineError> {
        loop {
            let current = rx.borrow().clone();
            match current {
                FetchState::Pending => {
                    if rx.changed().await.is_err() {
                        return Err(EngineError::Transport(
                            "version fetch abandoned".to_string(),
                        ));
                    }
                }
                FetchState::Loaded => {
                    {
                        let mut state = self.state.write();
                        let Some(artifact) = state.artifact.as_mut() else {
                            return Err(EngineError::VersionNotFound { index });
                        };
                        artifact.set_current(index)?;
                    }
                    self.schedule_save();
                    return Ok(());
                }
                FetchState::NotFound => {
                    return Err(EngineError::VersionNotFound { index });
                }
                FetchState::Failed(message) => {
                    return Err(EngineError::Transport(message));
                }
            }
        }
    }

    /// Previous/next navigation over the known version set
    #[must_use]
    pub fn navigation(&self, index: u32, compare_mode: bool) -> Navigation {
        let state = self.state.read();
        match &state.artifact {
            Some(artifact) => navigate(&artifact.metadata(), index, compare_mode),
            None => Navigation {
                previous: None,
                next: None,
            },
        }
    }

    /// Diff two loaded versions
    ///
    /// # Errors
    /// [`EngineError::VersionNotFound`] when either side is not loaded;
    /// [`EngineError::TypeMismatch`] across variants.
    pub fn diff(&self, base_index: u32, target_index: u32) -> Result<DiffView, EngineError> {
        let state = self.state.read();
        let artifact = state
            .artifact
            .as_ref()
            .ok_or(EngineError::VersionNotFound { index: base_index })?;
        let base = artifact
            .version(base_index)
            .ok_or(EngineError::VersionNotFound { index: base_index })?;
        let target = artifact
            .version(target_index)
            .ok_or(EngineError::VersionNotFound { index: target_index })?;
        let segments = diff_versions(base, target)?;
        let (left, right) = split_sides(&segments);
        Ok(DiffView {
            segments,
            left,
            right,
        })
    }

    /// Load a different thread
    ///
    /// Cancels the pending save, bumps the session epoch so in-flight
    /// results for the old thread are discarded, then pulls the listing
    /// and the newest version from the store.
    ///
    /// # Errors
    /// [`EngineError::Transport`] when the store cannot be reached; the
    /// session returns to idle either way.
    pub async fn switch_thread(&self, thread_id: impl Into<String>) -> Result<(), EngineError> {
        let thread_id = thread_id.into();
        self.saver.cancel();
        let epoch = {
            let mut state = self.state.write();
            state.transition(SessionPhase::SwitchingThread)?;
            state.epoch += 1;
            state.reset_for_thread(thread_id.clone());
            state.epoch
        };
        tracing::info!(%thread_id, "switching thread");

        let loaded = self.load_thread_artifact(&thread_id).await;

        let mut state = self.state.write();
        if state.epoch != epoch {
            tracing::debug!(%thread_id, "discarding stale thread load");
            return Ok(());
        }
        match loaded {
            Ok(artifact) => {
                state.artifact = artifact;
                // freshly loaded state mirrors the store exactly
                state.last_saved = Some(state.snapshot().fingerprint());
                state.transition(SessionPhase::Idle)?;
                Ok(())
            }
            Err(e) => {
                state.reported_error = Some(e.to_string());
                state.transition(SessionPhase::Idle)?;
                Err(e)
            }
        }
    }

    async fn load_thread_artifact(&self, thread_id: &str) -> Result<Option<Artifact>, EngineError> {
        let listing = self.store.list_versions(thread_id).await?;
        let Some(&max) = listing.indices.iter().max() else {
            return Ok(None);
        };
        let version = self.store.fetch_version(thread_id, max).await?;
        let mut artifact = Artifact::new(version);
        artifact.record_listing(&listing.indices, listing.total);
        Ok(Some(artifact))
    }

    /// Append a locally authored message before a stream starts
    ///
    /// Human messages are remembered as optimistically rendered so the
    /// stream's re-delivery of the same id is not duplicated.
    pub fn record_local_message(&self, message: Message) {
        {
            let mut state = self.state.write();
            if matches!(message.body, MessageBody::Human { .. }) {
                state.optimistic_human_ids.insert(message.id.clone());
            }
            state.messages.upsert(message);
        }
        self.schedule_save();
    }

    /// Flush state to the store immediately, bypassing the debounce
    ///
    /// Still a no-op when nothing semantically relevant changed.
    ///
    /// # Errors
    /// [`EngineError::SaveFailure`] when the write fails; the failure flag
    /// is set and the next successful save clears it.
    pub async fn save_now(&self) -> Result<(), EngineError> {
        self.saver.cancel();
        let epoch = self.state.read().epoch;
        save_once(&self.state, self.store.as_ref(), epoch)
            .await
            .map_err(|e| EngineError::SaveFailure(e.to_string()))
    }

    fn schedule_save(&self) {
        if self.state.read().saves_suppressed() {
            return;
        }
        self.saver.schedule(
            self.state.clone(),
            self.store.clone(),
            self.config.save_debounce,
        );
    }

    // --- presentation surface ---

    /// Current artifact, if any
    #[must_use]
    pub fn artifact(&self) -> Option<Artifact> {
        self.state.read().artifact.clone()
    }

    /// Transcript in display order
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.state.read().messages.as_slice().to_vec()
    }

    /// Is a stream being consumed right now?
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.state.read().is_streaming()
    }

    /// Current lifecycle phase
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.state.read().phase
    }

    /// Does the durable store match local state?
    #[must_use]
    pub fn is_saved(&self) -> bool {
        let state = self.state.read();
        !state.save_failed && state.last_saved.as_ref() == Some(&state.snapshot().fingerprint())
    }

    /// Did the last save fail without a successful one since?
    #[must_use]
    pub fn save_failed(&self) -> bool {
        self.state.read().save_failed
    }

    /// Last surfaced error
    #[must_use]
    pub fn reported_error(&self) -> Option<String> {
        self.state.read().reported_error.clone()
    }

    /// Thread title, once derived
    #[must_use]
    pub fn thread_title(&self) -> Option<String> {
        self.state.read().thread_title.clone()
    }

    /// Transcript crossed the summarization watermark
    #[must_use]
    pub fn needs_summarization(&self) -> bool {
        self.state.read().needs_summarization
    }

    /// Thread this session renders
    #[must_use]
    pub fn thread_id(&self) -> String {
        self.state.read().thread_id.clone()
    }
}
