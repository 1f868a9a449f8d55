//! Public and internal types for the reframe API and pipeline.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::utils::config::{
    DEFAULT_MIN_VALID_SIZE, MonitorConsts, PackagePaths, PipelineConsts, TransformConsts,
};

/// One unit of source input. Ordered by stem, which is the cross-location identity key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkItem {
    /// File name without extension.
    pub stem: String,
    /// Exact source file name (extension case preserved), used when staging.
    pub file_name: String,
}

impl WorkItem {
    pub fn new(stem: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            stem: stem.into(),
            file_name: file_name.into(),
        }
    }
}

/// Set of stems with a valid output in some location.
pub type StemSet = HashSet<String>;

/// One input folder and the two output locations it is tracked against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderContext {
    /// Input folder name as configured (used in reports).
    pub label: String,
    pub source_dir: PathBuf,
    /// Read-write output owned by the pipeline.
    pub primary_out: PathBuf,
    /// Read-only mirror filled out-of-band, when a secondary base is configured.
    pub secondary_out: Option<PathBuf>,
}

/// Where the pipeline currently is. Published in shared state for the monitor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Analyzing,
    Staging,
    Transforming,
    Cleaning,
    Done,
    Aborted,
}

/// Derived progress figures for one monitor tick. Not persisted.
#[derive(Clone, Debug)]
pub struct ProgressSnapshot {
    pub folder: String,
    pub phase: Phase,
    pub total: usize,
    /// Union count over primary and secondary.
    pub count: usize,
    pub primary_count: usize,
    /// `None` when the context has no secondary location.
    pub secondary_count: Option<usize>,
    pub percentage: f64,
    /// Smoothed items/sec since the folder was entered.
    pub throughput: f64,
    /// `None` while the rate is too low to extrapolate.
    pub eta: Option<Duration>,
    pub timestamp: DateTime<Local>,
}

/// How a run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every folder was processed (or had nothing missing).
    Completed,
    /// The transform failed or a batch could not be staged. Restart is safe.
    Aborted { reason: String },
    /// The running flag was cleared by the shutdown path.
    Interrupted,
}

/// Counters reported at the end of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub folders_done: usize,
    pub batches: usize,
    pub items_submitted: usize,
}

/// Parameters of the external transform invocation.
#[derive(Clone, Debug)]
pub struct TransformOpts {
    pub bin: PathBuf,
    pub model: String,
    pub scale: u32,
    pub tile: u32,
    pub format: String,
    pub gpu: String,
    /// load:proc:save thread counts.
    pub threads: String,
    /// Time allowed between graceful termination and kill.
    pub terminate_grace: Duration,
}

impl Default for TransformOpts {
    fn default() -> Self {
        Self {
            bin: PathBuf::from(TransformConsts::BIN),
            model: TransformConsts::MODEL.to_string(),
            scale: TransformConsts::SCALE,
            tile: TransformConsts::TILE,
            format: TransformConsts::FORMAT.to_string(),
            gpu: TransformConsts::GPU.to_string(),
            threads: TransformConsts::THREADS.to_string(),
            terminate_grace: TransformConsts::TERMINATE_GRACE,
        }
    }
}

/// Full run options (CLI, config file and lib).
#[derive(Clone, Debug)]
pub struct RunOpts {
    /// Base directory; input dirs, primary outputs and staging live under it.
    pub work_dir: PathBuf,
    /// Input folder names (relative to `work_dir`), processed in order.
    pub input_dirs: Vec<String>,
    /// Base of the read-only mirror. `None` disables the secondary location.
    pub secondary_base: Option<PathBuf>,
    pub input_token: String,
    pub primary_token: String,
    pub secondary_token: String,
    /// Staging directory. When None, uses `work_dir.join(<package staging dir name>)`.
    pub staging_dir: Option<PathBuf>,
    /// Hardlink sources into staging when on the same volume; copy otherwise.
    pub hardlink_staging: bool,
    pub max_batch_size: usize,
    pub monitor_interval: Duration,
    pub monitor_warmup: Duration,
    pub ema_alpha: f64,
    /// Outputs below this size (bytes) are incomplete.
    pub min_valid_size: u64,
    pub transform: TransformOpts,
}

impl Default for RunOpts {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            input_dirs: Vec::new(),
            secondary_base: None,
            input_token: PipelineConsts::INPUT_TOKEN.to_string(),
            primary_token: PipelineConsts::PRIMARY_TOKEN.to_string(),
            secondary_token: PipelineConsts::SECONDARY_TOKEN.to_string(),
            staging_dir: None,
            hardlink_staging: true,
            max_batch_size: PipelineConsts::MAX_BATCH_SIZE,
            monitor_interval: MonitorConsts::INTERVAL,
            monitor_warmup: MonitorConsts::WARMUP,
            ema_alpha: MonitorConsts::EMA_ALPHA,
            min_valid_size: DEFAULT_MIN_VALID_SIZE,
            transform: TransformOpts::default(),
        }
    }
}

impl RunOpts {
    /// Staging directory, defaulting to the package staging dir under `work_dir`.
    pub fn staging_path(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| self.work_dir.join(PackagePaths::get().staging_dir_name()))
    }
}
