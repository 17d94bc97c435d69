use filetime::FileTime;
use linkdupe::dedup::{DedupConfig, Walker};
use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;
use tempfile::tempdir;

const MTIME: i64 = 1_600_000_000;

fn write_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(path).unwrap().write_all(content).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o644)).unwrap();
    filetime::set_file_mtime(path, FileTime::from_unix_time(MTIME, 0)).unwrap();
}

fn ino(path: &Path) -> u64 {
    fs::metadata(path).unwrap().ino()
}

fn nlink(path: &Path) -> u64 {
    fs::metadata(path).unwrap().nlink()
}

#[test]
fn test_simple_duplicate_is_merged() {
    let dir = tempdir().unwrap();
    let f1 = dir.path().join("a/f1");
    let f2 = dir.path().join("b/f2");
    write_file(&f1, b"hello");
    write_file(&f2, b"hello");

    let mut walker = Walker::new(DedupConfig::default());
    walker.walk(&[dir.path()]).unwrap();

    assert_eq!(ino(&f1), ino(&f2));
    assert_eq!(nlink(&f1), 2);
    assert_eq!(fs::read(&f1).unwrap(), b"hello");
    assert_eq!(fs::read(&f2).unwrap(), b"hello");

    let summary = walker.into_summary();
    assert_eq!(summary.merges.len(), 1);
    assert_eq!(summary.kept_files, 1);
    assert_eq!(summary.bytes_reclaimed, 5);
}

#[test]
fn test_same_size_different_content_is_left_alone() {
    let dir = tempdir().unwrap();
    let f1 = dir.path().join("f1");
    let f2 = dir.path().join("f2");
    write_file(&f1, b"hello");
    write_file(&f2, b"world");

    let mut walker = Walker::new(DedupConfig::default());
    walker.walk(&[dir.path()]).unwrap();

    assert_ne!(ino(&f1), ino(&f2));
    assert_eq!(fs::read(&f1).unwrap(), b"hello");
    assert_eq!(fs::read(&f2).unwrap(), b"world");
    assert_eq!(walker.summary().kept_files, 2);
    assert!(walker.summary().merges.is_empty());
}

#[test]
fn test_existing_hardlink_group_is_absorbed_with_one_comparison() {
    let dir = tempdir().unwrap();
    let f1 = dir.path().join("f1");
    let f2 = dir.path().join("f2");
    let f3 = dir.path().join("f3");
    write_file(&f1, b"shared");
    fs::hard_link(&f1, &f2).unwrap();
    write_file(&f3, b"shared");

    let mut walker = Walker::new(DedupConfig::default());
    walker.walk(&[dir.path()]).unwrap();

    assert_eq!(ino(&f1), ino(&f2));
    assert_eq!(ino(&f1), ino(&f3));
    assert_eq!(nlink(&f1), 3);
    // Whichever name comes first, only one byte comparison is ever needed.
    assert_eq!(walker.matcher().comparisons(), 1);
}

#[test]
fn test_many_copies_collapse_into_one_inode() {
    let dir = tempdir().unwrap();
    let paths: Vec<_> = (0..6)
        .map(|i| dir.path().join(format!("d{}/copy", i % 3)).join(i.to_string()))
        .collect();
    for path in &paths {
        write_file(path, b"0123456789abcdef");
    }

    let mut walker = Walker::new(DedupConfig::default());
    walker.walk(&[dir.path()]).unwrap();

    let first = ino(&paths[0]);
    for path in &paths {
        assert_eq!(ino(path), first, "{} not merged", path.display());
    }
    assert_eq!(nlink(&paths[0]), 6);

    let summary = walker.summary();
    assert_eq!(summary.merges.len(), 5);
    assert_eq!(summary.bytes_reclaimed, 5 * 16);
}

#[test]
fn test_empty_files_are_merged() {
    let dir = tempdir().unwrap();
    let f1 = dir.path().join("empty1");
    let f2 = dir.path().join("empty2");
    write_file(&f1, b"");
    write_file(&f2, b"");

    let mut walker = Walker::new(DedupConfig::default());
    walker.walk(&[dir.path()]).unwrap();

    assert_eq!(ino(&f1), ino(&f2));
}

#[test]
fn test_large_file_with_late_difference() {
    let dir = tempdir().unwrap();
    let f1 = dir.path().join("big1");
    let f2 = dir.path().join("big2");
    let mut content = vec![7u8; 100_000];
    write_file(&f1, &content);
    *content.last_mut().unwrap() = 8;
    write_file(&f2, &content);

    let mut walker = Walker::new(DedupConfig::default().with_buffer_size(4096));
    walker.walk(&[dir.path()]).unwrap();

    assert_ne!(ino(&f1), ino(&f2));
}

#[test]
fn test_second_run_is_a_no_op() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("x/a"), b"one");
    write_file(&dir.path().join("y/b"), b"one");
    write_file(&dir.path().join("z/c"), b"two");

    let mut first = Walker::new(DedupConfig::default());
    first.walk(&[dir.path()]).unwrap();
    assert_eq!(first.summary().merges.len(), 1);

    let mut second = Walker::new(DedupConfig::default());
    second.walk(&[dir.path()]).unwrap();
    let summary = second.summary();
    assert!(summary.merges.is_empty());
    assert_eq!(summary.already_kept, 1);
    assert_eq!(summary.kept_files, 2);
}

#[test]
fn test_dry_run_reports_without_linking() {
    let dir = tempdir().unwrap();
    let f1 = dir.path().join("f1");
    let f2 = dir.path().join("f2");
    write_file(&f1, b"planned");
    write_file(&f2, b"planned");

    let mut walker = Walker::new(DedupConfig::default().with_dry_run(true));
    walker.walk(&[dir.path()]).unwrap();

    assert_ne!(ino(&f1), ino(&f2));
    assert_eq!(nlink(&f1), 1);
    assert_eq!(walker.summary().merges.len(), 1);
    assert!(walker.summary().dry_run);
}

#[test]
fn test_no_temporary_names_left_behind() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("f1"), b"same");
    write_file(&dir.path().join("f2"), b"same");

    let mut walker = Walker::new(DedupConfig::default());
    walker.walk(&[dir.path()]).unwrap();

    let mut names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, ["f1", "f2"]);
}
