//! Shared fixtures for integration tests.
#![allow(dead_code)]

use reframe::{RunOpts, TransformOpts};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Threshold used by fixtures; outputs of `VALID` bytes count, `PARTIAL` bytes do not.
pub const MIN_SIZE: u64 = 16;
pub const VALID: usize = 64;
pub const PARTIAL: usize = 4;

/// Write `size` bytes to `dir/name`, creating `dir`.
pub fn write_file(dir: &Path, name: &str, size: usize) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, vec![b'x'; size]).unwrap();
    path
}

/// Source folder `INPUT_AI_<suffix>` under `work` with one `.png` per stem.
pub fn source_folder(work: &Path, suffix: &str, stems: &[&str]) -> PathBuf {
    let dir = work.join(format!("INPUT_AI_{suffix}"));
    fs::create_dir_all(&dir).unwrap();
    for stem in stems {
        write_file(&dir, &format!("{stem}.png"), VALID);
    }
    dir
}

pub fn sorted_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(rd) => rd
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

/// Options for a run rooted at `work` with a mirror base at `work/nas`.
pub fn test_opts(work: &Path, inputs: &[&str], bin: &Path) -> RunOpts {
    RunOpts {
        work_dir: work.to_path_buf(),
        input_dirs: inputs.iter().map(|s| s.to_string()).collect(),
        secondary_base: Some(work.join("nas")),
        staging_dir: Some(work.join("staging")),
        max_batch_size: 2,
        min_valid_size: MIN_SIZE,
        transform: TransformOpts {
            bin: bin.to_path_buf(),
            terminate_grace: Duration::from_secs(2),
            ..TransformOpts::default()
        },
        ..RunOpts::default()
    }
}

/// Write an executable `sh` script to `dir/name`.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Transform stand-in: copies every staged file to the output dir (so outputs are `VALID` bytes)
/// and appends each staged name to `log`.
#[cfg(unix)]
pub fn copying_transform(dir: &Path, log: &Path) -> PathBuf {
    let body = format!(
        r#"while [ $# -gt 0 ]; do
  case "$1" in
    -i) IN="$2"; shift 2 ;;
    -o) OUT="$2"; shift 2 ;;
    *) shift ;;
  esac
done
for f in "$IN"/*; do
  [ -e "$f" ] || continue
  basename "$f" >> "{}"
  cp "$f" "$OUT/"
done"#,
        log.display()
    );
    write_script(dir, "fake-upscaler", &body)
}
