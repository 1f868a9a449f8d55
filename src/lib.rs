//! Reframe: crash-safe, resumable batch driver for external frame upscalers

pub mod check;
pub mod engine;
pub mod pipeline;
pub mod state;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use log::debug;
use std::sync::Arc;

use crate::engine::{ProgressMonitor, StagingArea, TransformSlot};
use crate::pipeline::{BatchProcessor, ShutdownCoordinator, folder_contexts};
use crate::state::SharedState;

/// Result alias used by public reframe API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: process every input folder in `opts` until done, aborted or interrupted.
///
/// Installs the SIGINT/SIGTERM handler (once per process), empties staging, starts the progress
/// monitor, and runs the batch loop. Once the handler has started, this blocks until it has
/// cleaned up, whatever the batch loop returned; the handler then exits the process with status 0.
pub fn run(opts: &RunOpts) -> Result<(RunOutcome, RunStats)> {
    let state = Arc::new(SharedState::new());
    let staging = Arc::new(
        StagingArea::open(&opts.staging_path())?.with_hardlinks(opts.hardlink_staging),
    );
    let slot = Arc::new(TransformSlot::new());

    let coordinator = Arc::new(ShutdownCoordinator::new(
        Arc::clone(&state),
        Arc::clone(&staging),
        Arc::clone(&slot),
        opts.min_valid_size,
        opts.transform.terminate_grace,
    ));
    coordinator.install()?;

    let monitor = ProgressMonitor::new(Arc::clone(&state), opts).spawn()?;

    let folders = folder_contexts(opts);
    debug!("{} folders configured", folders.len());
    let mut processor = BatchProcessor::new(opts.clone(), Arc::clone(&state), staging, slot);
    let outcome = processor.run(&folders);

    state.stop();
    monitor.stop();

    if coordinator.triggered() {
        coordinator.wait_for_cleanup();
    }
    let outcome = outcome?;
    Ok((outcome, processor.stats().clone()))
}
