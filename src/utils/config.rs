//! Application configuration constants.
//! Defaults, thresholds and package-derived names in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
    staging_dir_name: String,
    transform_bin_env: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!(".{pkg}.toml"),
                staging_dir_name: format!("_{pkg}_staging"),
                transform_bin_env: format!("{}_TRANSFORM_BIN", pkg.to_uppercase()),
            }
        })
    }

    /// Settings file looked up in the work directory (e.g. `.reframe.toml`).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Staging directory created under the work directory.
    pub fn staging_dir_name(&self) -> &str {
        &self.staging_dir_name
    }

    /// Environment variable overriding the transform executable path.
    pub fn transform_bin_env(&self) -> &str {
        &self.transform_bin_env
    }
}

// ---- File extensions ----

/// Source and output extensions. All comparisons are ASCII case-insensitive.
pub struct Extensions;

impl Extensions {
    /// Every work item exists in the source tree with this extension.
    pub const SOURCE: &'static str = "png";
    /// The transform may write either of these.
    pub const OUTPUTS: [&'static str; 2] = ["png", "jpg"];
}

// ---- Output validity ----

/// Outputs smaller than this are treated as in-progress or truncated (bytes).
/// A 4x upscaled HD frame is well above 100 KB.
pub const DEFAULT_MIN_VALID_SIZE: u64 = 50 * 1024;

// ---- Pipeline ----

/// Folder naming and batching defaults.
pub struct PipelineConsts;

impl PipelineConsts {
    /// Max items handed to one transform invocation.
    pub const MAX_BATCH_SIZE: usize = 500;
    /// Token in input folder names replaced to derive the primary output name.
    pub const INPUT_TOKEN: &'static str = "INPUT_AI";
    /// Replacement for [`Self::INPUT_TOKEN`] in the primary output name.
    pub const PRIMARY_TOKEN: &'static str = "UPSCALED";
    /// Replacement for [`Self::PRIMARY_TOKEN`] in the secondary mirror name.
    pub const SECONDARY_TOKEN: &'static str = "OUTPUT";
}

// ---- Progress monitor ----

/// Monitor cadence and smoothing.
pub struct MonitorConsts;

impl MonitorConsts {
    pub const INTERVAL: Duration = Duration::from_secs(300);
    /// Delay before the first check so the first batch can get going.
    pub const WARMUP: Duration = Duration::from_secs(10);
    /// EMA smoothing factor (weight of the newest sample).
    pub const EMA_ALPHA: f64 = 0.3;
    /// Seed used when the first sample shows no progress, so the ETA stays finite.
    pub const EMA_SEED_FLOOR: f64 = 0.1;
    /// Below this average rate (items/sec) the ETA is reported as unknown.
    pub const ETA_MIN_RATE: f64 = 0.001;
}

// ---- External transform ----

/// realesrgan-ncnn-vulkan style defaults.
pub struct TransformConsts;

impl TransformConsts {
    pub const BIN: &'static str = "realesrgan-ncnn-vulkan";
    pub const MODEL: &'static str = "realesrgan-x4plus";
    pub const SCALE: u32 = 4;
    /// Tile size; 0 lets the transform choose.
    pub const TILE: u32 = 0;
    pub const FORMAT: &'static str = "png";
    pub const GPU: &'static str = "0";
    /// load:proc:save thread counts.
    pub const THREADS: &'static str = "4:4:4";
    /// How long a terminated transform gets to exit before it is killed.
    pub const TERMINATE_GRACE: Duration = Duration::from_secs(10);
    /// Poll interval while waiting on the child (the slot lock is released between polls).
    pub const WAIT_POLL: Duration = Duration::from_millis(200);
}
