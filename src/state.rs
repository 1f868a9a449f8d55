//! State shared between the pipeline, the progress monitor and the shutdown path.
//!
//! Everything except the running flag sits behind one mutex. Readers take a [`StateSnapshot`]
//! (a full copy made under the lock) and never hold the lock across I/O.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::{FolderContext, Phase, StemSet, WorkItem};

#[derive(Default)]
struct StateInner {
    folder: Option<FolderContext>,
    generation: u64,
    entered_at: Option<Instant>,
    initial_count: usize,
    total: usize,
    secondary_cache: Option<Arc<StemSet>>,
    current_batch: Vec<WorkItem>,
    phase: Phase,
}

/// Consistent copy of the shared state at one instant.
#[derive(Clone, Debug, Default)]
pub struct StateSnapshot {
    pub folder: Option<FolderContext>,
    /// Bumped on every folder entry, so re-entering the same folder is still a new one.
    pub generation: u64,
    /// When the active folder was entered.
    pub entered_at: Option<Instant>,
    /// Completed count (union of both locations) found by the folder's analysis.
    pub initial_count: usize,
    /// Source item count of the active folder.
    pub total: usize,
    /// Valid secondary stems captured once for the active folder.
    pub secondary_cache: Option<Arc<StemSet>>,
    /// Items registered before the transform ran and cleared after cleanup.
    pub current_batch: Vec<WorkItem>,
    pub phase: Phase,
}

pub struct SharedState {
    inner: Mutex<StateInner>,
    running: AtomicBool,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StateInner::default()),
            running: AtomicBool::new(true),
        }
    }

    // Mutators assign whole values, so a poisoned guard is still consistent.
    fn lock(&self) -> MutexGuard<'_, StateInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Clear the running flag. Observed at folder and batch boundaries and by the monitor.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let inner = self.lock();
        StateSnapshot {
            folder: inner.folder.clone(),
            generation: inner.generation,
            entered_at: inner.entered_at,
            initial_count: inner.initial_count,
            total: inner.total,
            secondary_cache: inner.secondary_cache.clone(),
            current_batch: inner.current_batch.clone(),
            phase: inner.phase,
        }
    }

    /// Make `folder` the active context with its analysis results, all under one lock.
    /// `completed` is the union count the monitor measures progress from.
    /// Drops the previous batch.
    pub fn enter_folder(
        &self,
        folder: FolderContext,
        total: usize,
        secondary_cache: Option<StemSet>,
        completed: usize,
    ) {
        let mut inner = self.lock();
        inner.folder = Some(folder);
        inner.generation += 1;
        inner.entered_at = Some(Instant::now());
        inner.initial_count = completed;
        inner.total = total;
        inner.secondary_cache = secondary_cache.map(Arc::new);
        inner.current_batch.clear();
    }

    pub fn set_current_batch(&self, batch: &[WorkItem]) {
        self.lock().current_batch = batch.to_vec();
    }

    pub fn clear_current_batch(&self) {
        self.lock().current_batch.clear();
    }

    pub fn set_phase(&self, phase: Phase) {
        self.lock().phase = phase;
    }
}
