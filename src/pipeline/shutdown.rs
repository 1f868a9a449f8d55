//! Interrupt handling: stop the run, stop the transform, and leave a restart-safe tree behind.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, bounded};
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::check::purge_partial_outputs;
use crate::engine::staging::StagingArea;
use crate::engine::transform::TransformSlot;
use crate::state::SharedState;

/// What a shutdown cleaned up.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// A live transform had to be stopped.
    pub terminated_transform: bool,
    pub staging_removed: usize,
    /// Items of the interrupted batch that were checked.
    pub batch_len: usize,
    /// Sub-threshold outputs deleted from the primary output.
    pub partial_removed: usize,
}

pub struct ShutdownCoordinator {
    state: Arc<SharedState>,
    staging: Arc<StagingArea>,
    slot: Arc<TransformSlot>,
    min_valid_size: u64,
    grace: Duration,
    /// Set when cleanup begins; the run waits for it to finish from then on.
    triggered: AtomicBool,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
}

impl ShutdownCoordinator {
    pub fn new(
        state: Arc<SharedState>,
        staging: Arc<StagingArea>,
        slot: Arc<TransformSlot>,
        min_valid_size: u64,
        grace: Duration,
    ) -> Self {
        let (done_tx, done_rx) = bounded(1);
        Self {
            state,
            staging,
            slot,
            min_valid_size,
            grace,
            triggered: AtomicBool::new(false),
            done_tx,
            done_rx,
        }
    }

    /// Stop the run and clean up after the batch in flight. Best-effort: every step runs even
    /// if an earlier one hit errors, which are logged.
    pub fn cleanup(&self) -> CleanupReport {
        self.triggered.store(true, Ordering::SeqCst);
        self.state.stop();

        let terminated_transform = self.slot.terminate(self.grace);

        // Snapshot after the transform is gone so the batch cannot change underneath us
        let snap = self.state.snapshot();

        let staging_removed = self.staging.reset();
        info!("Staging cleared ({} entries)", staging_removed);

        let batch_len = snap.current_batch.len();
        let partial_removed = match (&snap.folder, batch_len) {
            (Some(folder), n) if n > 0 => {
                info!("Checking {} items of the interrupted batch...", n);
                purge_partial_outputs(
                    &folder.primary_out,
                    &snap.current_batch,
                    self.min_valid_size,
                )
            }
            _ => 0,
        };

        CleanupReport {
            terminated_transform,
            staging_removed,
            batch_len,
            partial_removed,
        }
    }

    /// Install the SIGINT/SIGTERM handler: clean up once, then exit with status 0.
    pub fn install(self: &Arc<Self>) -> Result<()> {
        let coordinator = Arc::clone(self);
        ctrlc::set_handler(move || {
            let rule = "=".repeat(60);
            warn!("{}", rule);
            warn!("Interrupt received, cleaning up...");
            coordinator.cleanup();
            info!("Cleanup complete. Restarting is safe.");
            warn!("{}", rule);
            let _ = coordinator.done_tx.try_send(());
            std::process::exit(0);
        })
        .context("set interrupt handler")
    }

    /// True once cleanup has started.
    pub fn triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Block until the signal handler has finished cleanup (it exits the process).
    /// Used by the main thread whenever cleanup has started, whatever the pipeline reported.
    pub fn wait_for_cleanup(&self) {
        let _ = self.done_rx.recv();
    }
}
