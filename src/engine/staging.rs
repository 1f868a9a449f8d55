//! Staging area: a disposable directory holding the current batch's inputs for the transform.
//!
//! Sources are hardlinked in when the staging dir shares their volume, copied otherwise.
//! Staging never writes to the source tree or to output locations.

use anyhow::{Context, Result};
use log::{debug, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::WorkItem;
use crate::utils::same_volume;

pub struct StagingArea {
    dir: PathBuf,
    /// When false, sources are always copied.
    hardlinks: bool,
    /// Set once the first copy fallback has been reported for this run.
    warned_copy: AtomicBool,
}

impl StagingArea {
    /// Create `dir` if needed and empty it, so nothing from a crashed run leaks into a new batch.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("create staging dir {}", dir.display()))?;
        let staging = Self {
            dir: dir.to_path_buf(),
            hardlinks: true,
            warned_copy: AtomicBool::new(false),
        };
        let removed = staging.reset();
        if removed > 0 {
            debug!("Removed {} stale staging entries", removed);
        }
        Ok(staging)
    }

    /// Allow or forbid hardlinking sources into staging.
    pub fn with_hardlinks(mut self, enabled: bool) -> Self {
        self.hardlinks = enabled;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// True once the copy fallback has been reported.
    pub fn copy_warned(&self) -> bool {
        self.warned_copy.load(Ordering::Relaxed)
    }

    fn entry_path(&self, item: &WorkItem) -> PathBuf {
        self.dir.join(&item.file_name)
    }

    /// Materialize `batch` from `source_dir` into staging. A failed copy fails the whole batch.
    pub fn acquire(&self, source_dir: &Path, batch: &[WorkItem]) -> Result<()> {
        let linkable = if !self.hardlinks {
            self.warn_copy_once("hardlinks disabled");
            false
        } else if !same_volume(source_dir, &self.dir) {
            self.warn_copy_once("staging and source are on different volumes");
            false
        } else {
            true
        };
        batch
            .par_iter()
            .try_for_each(|item| self.stage_one(source_dir, item, linkable))
    }

    fn stage_one(&self, source_dir: &Path, item: &WorkItem, linkable: bool) -> Result<()> {
        let src = source_dir.join(&item.file_name);
        let dst = self.entry_path(item);
        // Stale entry from an earlier batch: hard_link refuses to overwrite
        let _ = fs::remove_file(&dst);

        if linkable {
            match fs::hard_link(&src, &dst) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    self.warn_copy_once(&format!("hardlink {} failed: {}", src.display(), e));
                }
            }
        }
        fs::copy(&src, &dst)
            .with_context(|| format!("copy {} -> {}", src.display(), dst.display()))?;
        Ok(())
    }

    fn warn_copy_once(&self, why: &str) {
        if !self.warned_copy.swap(true, Ordering::Relaxed) {
            warn!("{}; copying sources into staging instead of hardlinking", why);
        }
    }

    /// Remove this batch's staging entries. Best-effort.
    pub fn release(&self, batch: &[WorkItem]) {
        for item in batch {
            let path = self.entry_path(item);
            if let Err(e) = fs::remove_file(&path)
                && e.kind() != std::io::ErrorKind::NotFound
            {
                warn!("Could not remove staging entry {}: {}", path.display(), e);
            }
        }
    }

    /// Empty the staging area. Returns how many entries were removed.
    pub fn reset(&self) -> usize {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not read staging dir {}: {}", self.dir.display(), e);
                }
                return 0;
            }
        };
        let mut removed = 0;
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => warn!("Could not remove staging entry {}: {}", path.display(), e),
            }
        }
        removed
    }
}
