//! Output integrity: removal of outputs below the validity threshold.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::WorkItem;
use crate::engine::resolver::{list_files, output_stem};
use crate::utils::Colors;

/// Remove sub-threshold outputs of `batch` from `output_dir`. Every accepted extension is
/// matched per item, in any case (`a.png`, `a.JPG`). Per-file errors are logged and skipped.
/// Returns how many files were removed.
///
/// Only ever pass the primary output here; the secondary mirror is not ours to modify.
pub fn purge_partial_outputs(output_dir: &Path, batch: &[WorkItem], min_valid_size: u64) -> usize {
    if batch.is_empty() || !output_dir.is_dir() {
        return 0;
    }
    let stems: HashSet<&str> = batch.iter().map(|item| item.stem.as_str()).collect();
    let mut removed = 0;
    for (name, size) in list_files(output_dir) {
        let in_batch = output_stem(&name).is_some_and(|stem| stems.contains(stem));
        if !in_batch || size >= min_valid_size {
            continue;
        }
        let path = output_dir.join(&name);
        match fs::remove_file(&path) {
            Ok(()) => {
                removed += 1;
                info!(
                    "Removed incomplete output {} ({} bytes)",
                    path.display(),
                    size
                );
            }
            Err(e) => warn!("Could not remove {}: {}", path.display(), e),
        }
    }
    if removed > 0 {
        info!(
            "{}",
            Colors::colorize(
                Colors::REMOVED,
                &format!("Removed {} incomplete outputs from the interrupted batch", removed)
            )
        );
    }
    removed
}

/// Sweep `output_dir` and remove every output (accepted extension) below `min_valid_size`.
/// Usable on any output directory outside the pipeline. Errors only if `output_dir` is unusable.
pub fn sweep_output_dir(output_dir: &Path, min_valid_size: u64) -> Result<usize> {
    let meta = fs::metadata(output_dir)
        .with_context(|| format!("read output dir {}", output_dir.display()))?;
    if !meta.is_dir() {
        anyhow::bail!("{} is not a directory", output_dir.display());
    }

    let mut removed = 0;
    let mut kept = 0;
    for (name, size) in list_files(output_dir) {
        if output_stem(&name).is_none() {
            continue;
        }
        if size >= min_valid_size {
            kept += 1;
            continue;
        }
        let path = output_dir.join(&name);
        match fs::remove_file(&path) {
            Ok(()) => {
                removed += 1;
                info!("Removed {} ({} bytes)", name, size);
            }
            Err(e) => warn!("Could not remove {}: {}", path.display(), e),
        }
    }
    debug!("Sweep of {}: {} kept", output_dir.display(), kept);
    info!(
        "{} | {}",
        Colors::colorize(Colors::DONE, &format!("Valid: {}", kept)),
        Colors::colorize(Colors::REMOVED, &format!("Removed: {}", removed))
    );
    Ok(removed)
}
