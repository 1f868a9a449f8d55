//! Transform binary lookup from the environment: env var → `.env` in the work dir.

use log::debug;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;

fn non_empty_var(key: &str) -> Option<String> {
    let s = std::env::var(key).ok()?;
    let s = s.trim().to_string();
    (!s.is_empty()).then_some(s)
}

/// Transform executable from `REFRAME_TRANSFORM_BIN`, falling back to a `.env` file in `dir`.
pub fn transform_bin_from_env(dir: &Path) -> Option<PathBuf> {
    let key = PackagePaths::get().transform_bin_env();
    if let Some(s) = non_empty_var(key) {
        return Some(PathBuf::from(s));
    }
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
        if let Some(s) = non_empty_var(key) {
            debug!("{} loaded from {}", key, env_path.display());
            return Some(PathBuf::from(s));
        }
    }
    None
}
