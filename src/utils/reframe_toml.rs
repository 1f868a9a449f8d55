//! Load `.reframe.toml` from the work directory (CLI only). Lib callers build [`RunOpts`] directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::RunOpts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReframeToml {
    #[serde(default)]
    settings: SettingsSection,
    #[serde(default)]
    transform: TransformSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsSection {
    inputs: Option<Vec<String>>,
    secondary_base: Option<String>,
    input_token: Option<String>,
    primary_token: Option<String>,
    secondary_token: Option<String>,
    staging_dir: Option<String>,
    hardlink_staging: Option<bool>,
    batch_size: Option<usize>,
    /// Seconds.
    monitor_interval: Option<u64>,
    /// Seconds.
    monitor_warmup: Option<u64>,
    ema_alpha: Option<f64>,
    /// Bytes.
    min_valid_size: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TransformSection {
    bin: Option<String>,
    model: Option<String>,
    scale: Option<u32>,
    tile: Option<u32>,
    format: Option<String>,
    gpu: Option<String>,
    threads: Option<String>,
    /// Seconds.
    terminate_grace: Option<u64>,
}

/// Parse settings text. Errors carry the TOML location.
pub fn parse_reframe_toml(s: &str) -> Result<ReframeToml, toml::de::Error> {
    toml::from_str(s)
}

/// Load the settings file from `dir` if present. Returns None if missing or unreadable.
pub fn load_reframe_toml(dir: &Path) -> Option<ReframeToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_reframe_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $($opts_field:ident).+) => {
        if let Some(v) = $sec.$sec_field.clone() {
            $opts.$($opts_field).+ = v;
        }
    };
    ($sec:expr, $opts:expr, $sec_field:ident => $($opts_field:ident).+, $conv:expr) => {
        if let Some(v) = $sec.$sec_field.clone() {
            $opts.$($opts_field).+ = $conv(v);
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI.
/// Relative paths in the file are taken relative to the work dir.
pub fn apply_file_to_opts(file: &ReframeToml, opts: &mut RunOpts) {
    let work_dir = opts.work_dir.clone();
    let resolve = |p: String| work_dir.join(PathBuf::from(p));

    let s = &file.settings;
    apply_file_opt!(s, opts, inputs => input_dirs);
    if let Some(p) = s.secondary_base.clone() {
        opts.secondary_base = Some(resolve(p));
    }
    apply_file_opt!(s, opts, input_token => input_token);
    apply_file_opt!(s, opts, primary_token => primary_token);
    apply_file_opt!(s, opts, secondary_token => secondary_token);
    if let Some(p) = s.staging_dir.clone() {
        opts.staging_dir = Some(resolve(p));
    }
    apply_file_opt!(s, opts, hardlink_staging => hardlink_staging);
    apply_file_opt!(s, opts, batch_size => max_batch_size);
    apply_file_opt!(s, opts, monitor_interval => monitor_interval, Duration::from_secs);
    apply_file_opt!(s, opts, monitor_warmup => monitor_warmup, Duration::from_secs);
    apply_file_opt!(s, opts, ema_alpha => ema_alpha);
    apply_file_opt!(s, opts, min_valid_size => min_valid_size);

    let t = &file.transform;
    apply_file_opt!(t, opts, bin => transform.bin, PathBuf::from);
    apply_file_opt!(t, opts, model => transform.model);
    apply_file_opt!(t, opts, scale => transform.scale);
    apply_file_opt!(t, opts, tile => transform.tile);
    apply_file_opt!(t, opts, format => transform.format);
    apply_file_opt!(t, opts, gpu => transform.gpu);
    apply_file_opt!(t, opts, threads => transform.threads);
    apply_file_opt!(t, opts, terminate_grace => transform.terminate_grace, Duration::from_secs);
}
