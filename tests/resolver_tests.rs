mod common;

use common::{MIN_SIZE, PARTIAL, VALID, write_file};
use reframe::engine::{
    completed_stems, count_completed, output_stem, resolve_missing, source_items, source_stem,
    valid_output_stems,
};
use reframe::{StemSet, WorkItem};

fn stems(items: &[WorkItem]) -> Vec<&str> {
    items.iter().map(|i| i.stem.as_str()).collect()
}

// --- name helpers ---

#[test]
fn test_output_stem_accepts_both_formats_any_case() {
    assert_eq!(output_stem("f001.png"), Some("f001"));
    assert_eq!(output_stem("f001.jpg"), Some("f001"));
    assert_eq!(output_stem("f001.JPG"), Some("f001"));
    assert_eq!(output_stem("f001.webp"), None);
    assert_eq!(output_stem("f001"), None);
    assert_eq!(output_stem(".png"), None);
}

#[test]
fn test_source_stem_only_png() {
    assert_eq!(source_stem("a.png"), Some("a"));
    assert_eq!(source_stem("a.PNG"), Some("a"));
    assert_eq!(source_stem("a.jpg"), None);
    assert_eq!(source_stem("clip.001.png"), Some("clip.001"));
}

// --- validity ---

#[test]
fn test_threshold_boundary() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    write_file(&out, "short.png", MIN_SIZE as usize - 1);
    write_file(&out, "exact.png", MIN_SIZE as usize);

    let valid = valid_output_stems(&out, MIN_SIZE);
    assert!(!valid.contains("short"));
    assert!(valid.contains("exact"));
    assert_eq!(valid.len(), 1);
}

#[test]
fn test_jpg_and_png_of_same_item_count_once() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    write_file(&out, "a.png", VALID);
    write_file(&out, "a.jpg", VALID);
    write_file(&out, "b.jpg", VALID);
    write_file(&out, "notes.txt", VALID);

    let valid = valid_output_stems(&out, MIN_SIZE);
    assert_eq!(valid, StemSet::from(["a".to_string(), "b".to_string()]));
}

#[test]
fn test_missing_dir_is_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let nowhere = tmp.path().join("nowhere");
    assert!(valid_output_stems(&nowhere, MIN_SIZE).is_empty());
    assert!(source_items(&nowhere).is_empty());
}

#[test]
fn test_subdirectories_are_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    std::fs::create_dir_all(out.join("nested.png")).unwrap();
    write_file(&out.join("deeper"), "x.png", VALID);
    assert!(valid_output_stems(&out, MIN_SIZE).is_empty());
}

// --- source listing ---

#[test]
fn test_source_items_sorted_and_filtered() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    for name in ["c.png", "a.png", "b.PNG", "readme.md", "d.jpg"] {
        write_file(&src, name, VALID);
    }
    let items = source_items(&src);
    assert_eq!(stems(&items), ["a", "b", "c"]);
    assert_eq!(items[1].file_name, "b.PNG");
}

// --- union / missing ---

#[test]
fn test_missing_set_example() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let primary = tmp.path().join("primary");
    let secondary = tmp.path().join("secondary");
    for s in ["a", "b", "c"] {
        write_file(&src, &format!("{s}.png"), VALID);
    }
    write_file(&primary, "a.png", VALID);
    write_file(&secondary, "b.jpg", VALID);

    let missing = resolve_missing(&src, &primary, Some(&secondary), None, MIN_SIZE);
    assert_eq!(stems(&missing), ["c"]);
}

#[test]
fn test_union_of_disjoint_sets() {
    let tmp = tempfile::tempdir().unwrap();
    let primary = tmp.path().join("primary");
    let secondary = tmp.path().join("secondary");
    for s in ["p1", "p2", "p3"] {
        write_file(&primary, &format!("{s}.png"), VALID);
    }
    for s in ["s1", "s2"] {
        write_file(&secondary, &format!("{s}.jpg"), VALID);
    }

    let p = valid_output_stems(&primary, MIN_SIZE);
    let s = valid_output_stems(&secondary, MIN_SIZE);
    let completed = completed_stems(&primary, Some(&secondary), None, MIN_SIZE);
    assert_eq!(completed, p.union(&s).cloned().collect::<StemSet>());
    assert_eq!(completed.len(), p.len() + s.len());
    assert_eq!(count_completed(&primary, Some(&secondary), None, MIN_SIZE), 5);
}

#[test]
fn test_cache_replaces_secondary_scan() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let primary = tmp.path().join("primary");
    let secondary = tmp.path().join("secondary");
    for s in ["a", "b", "c"] {
        write_file(&src, &format!("{s}.png"), VALID);
    }
    // The directory says "c" is done, the cache (captured earlier) says "b".
    write_file(&secondary, "c.png", VALID);
    let cache = StemSet::from(["b".to_string()]);

    let missing = resolve_missing(&src, &primary, Some(&secondary), Some(&cache), MIN_SIZE);
    assert_eq!(stems(&missing), ["a", "c"]);
}

#[test]
fn test_partial_outputs_are_still_missing() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let primary = tmp.path().join("primary");
    write_file(&src, "a.png", VALID);
    write_file(&src, "b.png", VALID);
    write_file(&primary, "a.png", PARTIAL);
    write_file(&primary, "b.jpg", VALID);

    let missing = resolve_missing(&src, &primary, None, None, MIN_SIZE);
    assert_eq!(stems(&missing), ["a"]);
}

#[test]
fn test_resolve_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let primary = tmp.path().join("primary");
    for i in (0..50).rev() {
        write_file(&src, &format!("frame_{i:04}.png"), VALID);
    }
    for i in (0..50).step_by(3) {
        write_file(&primary, &format!("frame_{i:04}.png"), VALID);
    }

    let first = resolve_missing(&src, &primary, None, None, MIN_SIZE);
    let second = resolve_missing(&src, &primary, None, None, MIN_SIZE);
    assert_eq!(first, second);
    assert!(first.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(first.len(), 50 - 17);
}
