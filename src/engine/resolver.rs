//! Outstanding-work resolution: source items minus valid outputs in either location.

use std::path::Path;

use walkdir::WalkDir;

use crate::utils::config::Extensions;
use crate::{StemSet, WorkItem};

/// Split a file name into `(stem, extension)` at the last dot. Names without a stem
/// (e.g. `.png`) or without an extension yield `None`.
pub fn split_name(name: &str) -> Option<(&str, &str)> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some((stem, ext))
}

/// Stem of `name` if its extension is one the transform may produce.
pub fn output_stem(name: &str) -> Option<&str> {
    let (stem, ext) = split_name(name)?;
    Extensions::OUTPUTS
        .iter()
        .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        .then_some(stem)
}

/// Stem of `name` if it carries the source extension.
pub fn source_stem(name: &str) -> Option<&str> {
    let (stem, ext) = split_name(name)?;
    ext.eq_ignore_ascii_case(Extensions::SOURCE).then_some(stem)
}

/// Immediate regular files of `dir` as `(file name, size)`. Missing or unreadable
/// directories give nothing; entries that fail to stat (e.g. vanished mid-scan) are skipped.
pub(crate) fn list_files(dir: &Path) -> impl Iterator<Item = (String, u64)> {
    WalkDir::new(dir)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            if !meta.is_file() {
                return None;
            }
            let name = entry.file_name().to_str()?.to_string();
            Some((name, meta.len()))
        })
}

/// Stems of outputs in `dir` that have an accepted extension and are at least `min_valid_size` bytes.
/// `x.png` and `x.jpg` both map to `x`, so an item valid in both formats counts once.
pub fn valid_output_stems(dir: &Path, min_valid_size: u64) -> StemSet {
    list_files(dir)
        .filter(|(_, size)| *size >= min_valid_size)
        .filter_map(|(name, _)| output_stem(&name).map(str::to_string))
        .collect()
}

/// Work items in `source_dir`, sorted by stem.
pub fn source_items(source_dir: &Path) -> Vec<WorkItem> {
    let mut items: Vec<WorkItem> = list_files(source_dir)
        .filter_map(|(name, _)| source_stem(&name).map(|stem| WorkItem::new(stem, name.as_str())))
        .collect();
    items.sort();
    // Same stem with differently-cased extensions (a.png / a.PNG) is one item.
    items.dedup_by(|a, b| a.stem == b.stem);
    items
}

/// Union of valid stems in the primary output and the secondary (cache when given, else a scan).
pub fn completed_stems(
    primary_out: &Path,
    secondary_out: Option<&Path>,
    secondary_cache: Option<&StemSet>,
    min_valid_size: u64,
) -> StemSet {
    let mut completed = valid_output_stems(primary_out, min_valid_size);
    match (secondary_cache, secondary_out) {
        (Some(cache), _) => completed.extend(cache.iter().cloned()),
        (None, Some(dir)) => completed.extend(valid_output_stems(dir, min_valid_size)),
        (None, None) => {}
    }
    completed
}

/// Number of distinct items with a valid output in either location.
pub fn count_completed(
    primary_out: &Path,
    secondary_out: Option<&Path>,
    secondary_cache: Option<&StemSet>,
    min_valid_size: u64,
) -> usize {
    completed_stems(primary_out, secondary_out, secondary_cache, min_valid_size).len()
}

/// Items in `source_dir` without a valid output in either location, sorted by stem so
/// batch boundaries are the same on every restart.
pub fn resolve_missing(
    source_dir: &Path,
    primary_out: &Path,
    secondary_out: Option<&Path>,
    secondary_cache: Option<&StemSet>,
    min_valid_size: u64,
) -> Vec<WorkItem> {
    let completed = completed_stems(primary_out, secondary_out, secondary_cache, min_valid_size);
    missing_items(source_items(source_dir), &completed)
}

/// `items` whose stem is not in `completed`, order preserved.
pub fn missing_items(items: Vec<WorkItem>, completed: &StemSet) -> Vec<WorkItem> {
    items
        .into_iter()
        .filter(|item| !completed.contains(&item.stem))
        .collect()
}
