use filetime::FileTime;
use linkdupe::dedup::{DedupConfig, WalkIssue, Walker};
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use tempfile::tempdir;

fn write_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
    filetime::set_file_mtime(path, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();
}

fn ino(path: &Path) -> u64 {
    fs::metadata(path).unwrap().ino()
}

#[test]
fn test_duplicates_across_roots_are_merged_into_first_root() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first");
    let second = dir.path().join("second");
    let kept = first.join("lib.so");
    let dup = second.join("nested/lib.so");
    write_file(&kept, b"library bytes");
    write_file(&dup, b"library bytes");
    let kept_ino = ino(&kept);

    let mut walker = Walker::new(DedupConfig::default());
    walker.walk(&[&first, &second]).unwrap();

    // Roots are processed in order, so the first root supplies the kept copy.
    assert_eq!(ino(&kept), kept_ino);
    assert_eq!(ino(&dup), kept_ino);
    assert_eq!(walker.summary().roots_processed, 2);
    let merge = &walker.summary().merges[0];
    assert_eq!(merge.kept, kept);
    assert_eq!(merge.linked, dup);
}

#[test]
fn test_same_root_twice_is_harmless() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("a"), b"x");
    write_file(&dir.path().join("b"), b"x");

    let mut walker = Walker::new(DedupConfig::default());
    walker.walk(&[dir.path(), dir.path()]).unwrap();

    let summary = walker.summary();
    assert_eq!(summary.merges.len(), 1);
    assert_eq!(summary.files_examined, 4);
    assert_eq!(summary.already_kept, 2);
}

#[test]
fn test_unreadable_root_does_not_stop_the_run() {
    let dir = tempdir().unwrap();
    let present = dir.path().join("present");
    write_file(&present.join("a"), b"x");
    write_file(&present.join("b"), b"x");

    let mut walker = Walker::new(DedupConfig::default());
    walker
        .walk(&[dir.path().join("absent"), present.clone()])
        .unwrap();

    let summary = walker.summary();
    assert!(summary.has_unreadable_roots());
    assert_eq!(summary.merges.len(), 1);
    assert!(matches!(
        summary.issues[0],
        WalkIssue::RootUnreadable { .. }
    ));
    assert!(summary.issues[0].path().ends_with("absent"));
}

#[test]
#[cfg(target_os = "linux")]
fn test_cross_device_root_is_reported_and_skipped() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("a"), b"x");
    write_file(&dir.path().join("b"), b"x");

    let mut walker = Walker::new(DedupConfig::default());
    walker.walk(&[dir.path(), Path::new("/proc")]).unwrap();

    let summary = walker.summary();
    assert_eq!(summary.roots_cross_device, 1);
    assert_eq!(summary.roots_processed, 1);
    assert_eq!(summary.merges.len(), 1);
    assert!(!summary.has_unreadable_roots());
    assert!(matches!(&summary.issues[0], WalkIssue::CrossDevice(p) if p == Path::new("/proc")));
}

#[test]
fn test_device_is_fixed_by_first_root() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("a"), b"x");

    let mut walker = Walker::new(DedupConfig::default());
    walker.walk(&[dir.path()]).unwrap();

    assert_eq!(walker.device(), Some(fs::metadata(dir.path()).unwrap().dev()));
}

#[test]
#[cfg(target_os = "linux")]
fn test_cross_device_entry_below_root_is_skipped() {
    // /dev/pts is normally its own filesystem mounted inside devtmpfs.
    let (Ok(dev), Ok(pts)) = (
        fs::symlink_metadata("/dev"),
        fs::symlink_metadata("/dev/pts"),
    ) else {
        return;
    };
    if dev.dev() == pts.dev() {
        return;
    }

    let mut walker = Walker::new(DedupConfig::default().with_dry_run(true));
    walker.walk(&[Path::new("/dev")]).unwrap();

    let summary = walker.summary();
    assert!(summary.entries_cross_device >= 1);
    assert_eq!(summary.roots_cross_device, 0);
    assert!(summary.merges.is_empty());
    assert!(summary
        .issues
        .iter()
        .any(|issue| matches!(issue, WalkIssue::CrossDevice(p) if p == Path::new("/dev/pts"))));
}
