//! Pipeline components: folder contexts, the batch loop, and interrupt cleanup.

pub mod context;
pub mod orchestrator;
pub mod shutdown;

pub use context::{folder_contexts, primary_name, secondary_path};
pub use orchestrator::{BatchProcessor, partition_batches};
pub use shutdown::{CleanupReport, ShutdownCoordinator};
