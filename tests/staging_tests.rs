mod common;

use common::{VALID, sorted_names, write_file};
use reframe::WorkItem;
use reframe::engine::StagingArea;
use reframe::utils::same_volume;
use std::fs;

fn items(names: &[&str]) -> Vec<WorkItem> {
    names
        .iter()
        .map(|n| WorkItem::new(n.trim_end_matches(".png"), *n))
        .collect()
}

#[test]
fn test_open_creates_and_clears_stale_entries() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("staging");
    write_file(&dir, "left_over.png", VALID);
    fs::create_dir_all(dir.join("junk_dir")).unwrap();

    let staging = StagingArea::open(&dir).unwrap();
    assert!(dir.is_dir());
    assert!(sorted_names(staging.dir()).is_empty());
}

#[test]
fn test_acquire_and_release_batch() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    for n in ["a.png", "b.png", "c.png"] {
        write_file(&src, n, VALID);
    }
    let staging = StagingArea::open(&tmp.path().join("staging")).unwrap();
    let batch = items(&["a.png", "b.png"]);

    staging.acquire(&src, &batch).unwrap();
    assert_eq!(sorted_names(staging.dir()), ["a.png", "b.png"]);
    assert_eq!(fs::read(staging.dir().join("a.png")).unwrap().len(), VALID);

    staging.release(&batch);
    assert!(sorted_names(staging.dir()).is_empty());
    // Sources are untouched
    assert_eq!(sorted_names(&src), ["a.png", "b.png", "c.png"]);
}

#[cfg(unix)]
#[test]
fn test_acquire_hardlinks_on_same_volume() {
    use std::os::unix::fs::MetadataExt;

    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    write_file(&src, "a.png", VALID);
    let staging = StagingArea::open(&tmp.path().join("staging")).unwrap();
    assert!(same_volume(&src, staging.dir()));

    staging.acquire(&src, &items(&["a.png"])).unwrap();
    let src_meta = fs::metadata(src.join("a.png")).unwrap();
    let staged_meta = fs::metadata(staging.dir().join("a.png")).unwrap();
    assert_eq!(src_meta.ino(), staged_meta.ino());
    assert_eq!(src_meta.nlink(), 2);

    staging.release(&items(&["a.png"]));
    assert_eq!(fs::metadata(src.join("a.png")).unwrap().nlink(), 1);
}

#[test]
fn test_acquire_copies_when_hardlinks_disabled() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    for n in ["a.png", "b.png", "c.png"] {
        write_file(&src, n, VALID);
    }
    let staging = StagingArea::open(&tmp.path().join("staging"))
        .unwrap()
        .with_hardlinks(false);
    assert!(!staging.copy_warned());

    staging.acquire(&src, &items(&["a.png", "b.png"])).unwrap();
    assert!(staging.copy_warned());
    assert_eq!(sorted_names(staging.dir()), ["a.png", "b.png"]);

    // Copies are independent of the sources
    fs::write(staging.dir().join("a.png"), b"changed").unwrap();
    assert_eq!(fs::read(src.join("a.png")).unwrap().len(), VALID);

    // Later batches keep copying and the warning stays latched
    staging.acquire(&src, &items(&["c.png"])).unwrap();
    assert!(staging.copy_warned());
    assert_eq!(sorted_names(staging.dir()), ["a.png", "b.png", "c.png"]);
}

#[cfg(unix)]
#[test]
fn test_copied_entries_are_separate_inodes() {
    use std::os::unix::fs::MetadataExt;

    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    write_file(&src, "a.png", VALID);
    let staging = StagingArea::open(&tmp.path().join("staging"))
        .unwrap()
        .with_hardlinks(false);

    staging.acquire(&src, &items(&["a.png"])).unwrap();
    let src_meta = fs::metadata(src.join("a.png")).unwrap();
    let staged_meta = fs::metadata(staging.dir().join("a.png")).unwrap();
    assert_ne!(src_meta.ino(), staged_meta.ino());
    assert_eq!(src_meta.nlink(), 1);
    assert_eq!(staged_meta.len(), VALID as u64);
}

#[test]
fn test_hardlinked_staging_does_not_warn() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    write_file(&src, "a.png", VALID);
    let staging = StagingArea::open(&tmp.path().join("staging")).unwrap();
    if same_volume(&src, staging.dir()) {
        staging.acquire(&src, &items(&["a.png"])).unwrap();
        assert!(!staging.copy_warned());
    }
}

#[test]
fn test_acquire_replaces_stale_entry() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    write_file(&src, "a.png", VALID);
    let staging = StagingArea::open(&tmp.path().join("staging")).unwrap();
    write_file(staging.dir(), "a.png", 3);

    staging.acquire(&src, &items(&["a.png"])).unwrap();
    assert_eq!(fs::read(staging.dir().join("a.png")).unwrap().len(), VALID);
}

#[test]
fn test_acquire_missing_source_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    write_file(&src, "a.png", VALID);
    let staging = StagingArea::open(&tmp.path().join("staging")).unwrap();

    let err = staging.acquire(&src, &items(&["a.png", "gone.png"]));
    assert!(err.is_err());
}

#[test]
fn test_reset_reports_removed_count() {
    let tmp = tempfile::tempdir().unwrap();
    let staging = StagingArea::open(&tmp.path().join("staging")).unwrap();
    for n in ["x.png", "y.png", "z.png"] {
        write_file(staging.dir(), n, 1);
    }
    assert_eq!(staging.reset(), 3);
    assert_eq!(staging.reset(), 0);
}

#[test]
fn test_same_volume_for_missing_path_is_false() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(!same_volume(tmp.path(), &tmp.path().join("missing")));
}
