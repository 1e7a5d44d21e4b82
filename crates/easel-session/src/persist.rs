//! Persistence coordinator
//!
//! Debounced, failure-tolerant save of local state. Every mutation
//! reschedules the pending save; streaming or switching threads suppresses
//! it entirely. Before writing, the semantically relevant fields of the
//! current version are compared against the last saved fingerprint so
//! no-op mutations never reach the network.

use crate::state::SessionState;
use easel_store::VersionStore;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Debounced save scheduler
///
/// Holds at most one pending save task; scheduling aborts the previous
/// one, so the delay restarts on every new mutation.
#[derive(Debug, Default)]
pub(crate) struct SaveScheduler {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SaveScheduler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Cancel the pending save, if any
    pub(crate) fn cancel(&self) {
        if let Some(task) = self.pending.lock().take() {
            task.abort();
        }
    }

    /// Schedule a save after the debounce window
    pub(crate) fn schedule(
        &self,
        state: Arc<RwLock<SessionState>>,
        store: Arc<dyn VersionStore>,
        delay: Duration,
    ) {
        let mut slot = self.pending.lock();
        if let Some(task) = slot.take() {
            task.abort();
        }
        let epoch = state.read().epoch;
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = save_once(&state, store.as_ref(), epoch).await {
                tracing::warn!(error = %e, "debounced save failed");
            }
        }));
    }
}

impl Drop for SaveScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.pending.get_mut().take() {
            task.abort();
        }
    }
}

/// Write the current state if it would change anything
///
/// Skips silently when the session context moved on (epoch bumped, phase
/// suppressing saves) or when the fingerprint matches the last successful
/// write. A failed write sets the visible flag and is not retried; the
/// next successful save clears it.
pub(crate) async fn save_once(
    state: &RwLock<SessionState>,
    store: &dyn VersionStore,
    epoch: u64,
) -> Result<(), easel_store::StoreError> {
    let snapshot = {
        let s = state.read();
        if s.epoch != epoch || s.saves_suppressed() {
            return Ok(());
        }
        let snapshot = s.snapshot();
        if s.last_saved.as_ref() == Some(&snapshot.fingerprint()) {
            tracing::trace!("skipping no-op save");
            return Ok(());
        }
        snapshot
    };

    let fingerprint = snapshot.fingerprint();
    match store.persist_state(&snapshot).await {
        Ok(()) => {
            let mut s = state.write();
            if s.epoch == epoch {
                s.last_saved = Some(fingerprint);
                s.save_failed = false;
            }
            Ok(())
        }
        Err(e) => {
            let mut s = state.write();
            if s.epoch == epoch {
                s.save_failed = true;
            }
            Err(e)
        }
    }
}
