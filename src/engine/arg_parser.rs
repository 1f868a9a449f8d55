use clap::Parser;
use std::path::PathBuf;

struct DefaultArgs;

impl DefaultArgs {
    pub const DIR: &'static str = ".";
}

/// Crash-safe, resumable batch driver for external frame upscalers.
#[derive(Clone, Parser)]
#[command(name = "reframe")]
#[command(about = "Upscale every missing frame in the configured input folders; safe to interrupt and restart.")]
pub struct Cli {
    /// Work directory holding the input folders, outputs and staging. Default: current directory.
    #[arg(value_name = "WORK_DIR", default_value = DefaultArgs::DIR)]
    pub dir: PathBuf,

    /// Input folder names under WORK_DIR, processed in order. Can specify multiple: -i a b c
    #[arg(long = "input", short = 'i', num_args = 1..)]
    pub inputs: Vec<String>,

    /// Base directory of the read-only output mirror (used for progress only, never written).
    #[arg(long)]
    pub secondary_base: Option<PathBuf>,

    /// Path to the transform executable. Also read from REFRAME_TRANSFORM_BIN / .env.
    #[arg(long, short = 't')]
    pub transform_bin: Option<PathBuf>,

    /// Transform model name.
    #[arg(long, short = 'n')]
    pub model: Option<String>,

    /// Transform scale factor.
    #[arg(long, short = 's')]
    pub scale: Option<u32>,

    /// Max items per transform invocation.
    #[arg(long, short = 'b')]
    pub batch_size: Option<usize>,

    /// Seconds between progress reports.
    #[arg(long)]
    pub interval: Option<u64>,

    /// Minimum size (bytes) for an output to count as complete.
    #[arg(long)]
    pub min_size: Option<u64>,

    /// Remove outputs below the minimum size from DIR and exit (no upscaling).
    #[arg(long, value_name = "DIR")]
    pub sweep: Option<PathBuf>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
