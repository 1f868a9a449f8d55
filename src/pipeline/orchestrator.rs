//! Batch processor: analyze each folder, then stage and transform its missing items batch by batch.
//!
//! Per folder: `Idle → Analyzing → {Done | Staging → Transforming → Cleaning (per batch)}`,
//! ending in `Done` or `Aborted`. A batch is registered in shared state before the transform
//! starts and cleared only after its staging entries are released; the shutdown path relies
//! on that to find partial outputs of an interrupted batch.

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::fs;
use std::sync::Arc;

use crate::engine::resolver::{completed_stems, missing_items, source_items, valid_output_stems};
use crate::engine::staging::StagingArea;
use crate::engine::transform::{TransformExit, TransformSlot, transform_command};
use crate::state::SharedState;
use crate::utils::Colors;
use crate::{FolderContext, Phase, RunOpts, RunOutcome, RunStats, WorkItem};

/// Split `items` into consecutive batches of at most `max` (a `max` of 0 is treated as 1).
pub fn partition_batches(items: &[WorkItem], max: usize) -> Vec<&[WorkItem]> {
    items.chunks(max.max(1)).collect()
}

/// How one folder ended; anything but `Done` ends the run.
enum FolderOutcome {
    Done,
    Aborted(String),
    Interrupted,
}

pub struct BatchProcessor {
    opts: RunOpts,
    state: Arc<SharedState>,
    staging: Arc<StagingArea>,
    slot: Arc<TransformSlot>,
    stats: RunStats,
}

impl BatchProcessor {
    pub fn new(
        opts: RunOpts,
        state: Arc<SharedState>,
        staging: Arc<StagingArea>,
        slot: Arc<TransformSlot>,
    ) -> Self {
        Self {
            opts,
            state,
            staging,
            slot,
            stats: RunStats::default(),
        }
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Process `folders` in order. Errors are reserved for unexpected I/O (e.g. the primary
    /// output cannot be created); transform and staging failures come back as `Aborted`.
    pub fn run(&mut self, folders: &[FolderContext]) -> Result<RunOutcome> {
        for folder in folders {
            if !self.state.is_running() {
                return Ok(RunOutcome::Interrupted);
            }
            match self.process_folder(folder)? {
                FolderOutcome::Done => self.stats.folders_done += 1,
                FolderOutcome::Aborted(reason) => {
                    self.state.set_phase(Phase::Aborted);
                    self.state.stop();
                    error!("Run aborted: {}", reason);
                    return Ok(RunOutcome::Aborted { reason });
                }
                FolderOutcome::Interrupted => return Ok(RunOutcome::Interrupted),
            }
        }
        self.state.set_phase(Phase::Done);
        Ok(RunOutcome::Completed)
    }

    fn process_folder(&mut self, folder: &FolderContext) -> Result<FolderOutcome> {
        if !folder.source_dir.is_dir() {
            debug!("Skipping {}: no such folder", folder.source_dir.display());
            return Ok(FolderOutcome::Done);
        }
        if folder.primary_out == folder.source_dir {
            warn!(
                "Skipping {}: name has no '{}' token, output would overwrite the sources",
                folder.label, self.opts.input_token
            );
            return Ok(FolderOutcome::Done);
        }
        fs::create_dir_all(&folder.primary_out)
            .with_context(|| format!("create output dir {}", folder.primary_out.display()))?;

        self.state.set_phase(Phase::Analyzing);
        info!("Analyzing {}...", folder.label);
        let items = source_items(&folder.source_dir);
        let total = items.len();

        // Captured once per folder; the mirror is slow to scan and only changes out-of-band
        let cache = folder
            .secondary_out
            .as_deref()
            .map(|dir| valid_output_stems(dir, self.opts.min_valid_size));
        let completed = completed_stems(
            &folder.primary_out,
            folder.secondary_out.as_deref(),
            cache.as_ref(),
            self.opts.min_valid_size,
        );
        let completed_count = completed.len();
        let missing = missing_items(items, &completed);
        self.state.enter_folder(folder.clone(), total, cache, completed_count);

        if missing.is_empty() {
            info!(
                "{}",
                Colors::colorize(
                    Colors::DONE,
                    &format!("{} complete ({} items). Skipping.", folder.label, total)
                )
            );
            self.state.set_phase(Phase::Done);
            return Ok(FolderOutcome::Done);
        }
        info!(
            "{} of {} items missing in {}",
            missing.len(),
            total,
            folder.label
        );
        if let Some(dir) = &folder.secondary_out {
            info!("Mirror (read-only): {}", dir.display());
        }

        let batches = partition_batches(&missing, self.opts.max_batch_size);
        let batch_count = batches.len();
        for (i, batch) in batches.into_iter().enumerate() {
            if !self.state.is_running() {
                return Ok(FolderOutcome::Interrupted);
            }
            info!(
                "Batch {}/{} ({} items)...",
                i + 1,
                batch_count,
                batch.len()
            );
            match self.process_batch(folder, batch) {
                FolderOutcome::Done => {}
                other => return Ok(other),
            }
        }
        self.state.set_phase(Phase::Done);
        Ok(FolderOutcome::Done)
    }

    fn process_batch(&mut self, folder: &FolderContext, batch: &[WorkItem]) -> FolderOutcome {
        self.state.set_current_batch(batch);

        self.state.set_phase(Phase::Staging);
        if let Err(e) = self.staging.acquire(&folder.source_dir, batch) {
            return self.failed(format!("staging failed: {:#}", e));
        }

        self.state.set_phase(Phase::Transforming);
        let cmd = transform_command(
            &self.opts.transform,
            self.staging.dir(),
            &folder.primary_out,
        );
        match self.slot.run(cmd) {
            Ok(TransformExit::Success) => {}
            Ok(TransformExit::Failed(status)) => {
                return self.failed(format!("transform exited with {}", status));
            }
            Ok(TransformExit::Terminated) => return FolderOutcome::Interrupted,
            Err(e) => return self.failed(format!("{:#}", e)),
        }
        self.stats.batches += 1;
        self.stats.items_submitted += batch.len();

        self.state.set_phase(Phase::Cleaning);
        self.staging.release(batch);
        self.state.clear_current_batch();
        FolderOutcome::Done
    }

    /// Failures seen after the running flag cleared (e.g. the transform also got the
    /// terminal's SIGINT) count as interruption.
    fn failed(&self, reason: String) -> FolderOutcome {
        if self.state.is_running() {
            FolderOutcome::Aborted(reason)
        } else {
            debug!("Ignoring failure during shutdown: {}", reason);
            FolderOutcome::Interrupted
        }
    }
}
