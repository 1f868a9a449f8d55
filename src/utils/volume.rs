//! Same-volume detection for choosing hardlink vs copy when staging.

use std::path::Path;

/// True when `a` and `b` live on the same filesystem, i.e. a hardlink between them can succeed.
/// Paths that cannot be inspected are reported as different volumes (copy is always safe).
#[cfg(unix)]
pub fn same_volume(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (std::fs::metadata(a), std::fs::metadata(b)) {
        (Ok(ma), Ok(mb)) => ma.dev() == mb.dev(),
        _ => false,
    }
}

/// True when `a` and `b` resolve to the same mount point (longest-prefix match against the disk list).
#[cfg(not(unix))]
pub fn same_volume(a: &Path, b: &Path) -> bool {
    use sysinfo::Disks;

    let disks = Disks::new_with_refreshed_list();
    let mount_for = |p: &Path| {
        let p = p.canonicalize().ok()?;
        disks
            .iter()
            .map(|d| d.mount_point().to_path_buf())
            .filter(|m| p.starts_with(m))
            .max_by_key(|m| m.as_os_str().len())
    };
    match (mount_for(a), mount_for(b)) {
        (Some(ma), Some(mb)) => ma == mb,
        _ => false,
    }
}
