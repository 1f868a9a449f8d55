//! Engine module: resolution, staging, transform invocation and progress tracking

pub mod arg_parser;
pub mod cli;
pub mod progress;
pub mod resolver;
pub mod staging;
pub mod transform;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::{build_opts, handle_run};
pub use progress::{
    MonitorHandle, ProgressMonitor, ThroughputEstimator, eta, format_eta, percentage,
};
pub use resolver::{
    completed_stems, count_completed, missing_items, output_stem, resolve_missing, source_items,
    source_stem, valid_output_stems,
};
pub use staging::StagingArea;
pub use transform::{TransformExit, TransformSlot, transform_command};
