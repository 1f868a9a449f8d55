pub mod config;
pub mod env;
pub mod logger;
pub mod reframe_toml;
pub mod volume;

pub use config::*;
pub use env::transform_bin_from_env;
pub use logger::{Colors, setup_logging};
pub use reframe_toml::{ReframeToml, apply_file_to_opts, load_reframe_toml, parse_reframe_toml};
pub use volume::same_volume;
