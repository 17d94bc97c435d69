use filetime::FileTime;
use linkdupe::dedup::{
    DedupConfig, DedupError, LinkError, LinkFs, LinkStage, Linker, SystemFs, Walker,
};
use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use tempfile::tempdir;

fn write_file(path: &Path, content: &[u8]) {
    fs::write(path, content).unwrap();
    filetime::set_file_mtime(path, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();
}

/// Real links, but every unlink is refused.
struct NoUnlink;

impl LinkFs for NoUnlink {
    fn hard_link(&self, original: &Path, link: &Path) -> io::Result<()> {
        SystemFs.hard_link(original, link)
    }

    fn remove_file(&self, _path: &Path) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::PermissionDenied))
    }
}

/// Deletes the destination right before the first link, as a concurrent
/// process would.
struct Vanishing;

impl LinkFs for Vanishing {
    fn hard_link(&self, original: &Path, link: &Path) -> io::Result<()> {
        let _ = fs::remove_file(link);
        SystemFs.hard_link(original, link)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        SystemFs.remove_file(path)
    }
}

#[test]
fn test_unlink_failure_aborts_and_leaves_destination() {
    let dir = tempdir().unwrap();
    let f1 = dir.path().join("f1");
    let f2 = dir.path().join("f2");
    write_file(&f1, b"same");
    write_file(&f2, b"same");
    let before = (
        fs::metadata(&f1).unwrap().ino(),
        fs::metadata(&f2).unwrap().ino(),
    );

    let config = DedupConfig::default();
    let mut walker = Walker::with_linker(&config, Linker::with_fs(NoUnlink, false));
    let err = walker.walk(&[dir.path()]).unwrap_err();

    let DedupError::Link(link) = err;
    match link {
        LinkError::InstallFailure { stage, .. } => assert_eq!(stage, LinkStage::Unlink),
        other => panic!("unexpected error: {other}"),
    }
    let after = (
        fs::metadata(&f1).unwrap().ino(),
        fs::metadata(&f2).unwrap().ino(),
    );
    assert_eq!(before, after);
    assert!(walker.summary().merges.is_empty());
}

#[test]
fn test_vanished_destination_is_a_race_violation() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("f1"), b"same");
    write_file(&dir.path().join("f2"), b"same");

    let config = DedupConfig::default();
    let mut walker = Walker::with_linker(&config, Linker::with_fs(Vanishing, false));
    let err = walker.walk(&[dir.path()]).unwrap_err();

    let DedupError::Link(link) = err;
    assert!(matches!(link, LinkError::RaceViolation { .. }));
    assert!(link.to_string().contains("race condition"));
    // The destination name exists again, pointing at the kept inode.
    let dest = link.dest();
    assert!(dest.exists());
    assert_eq!(fs::metadata(dest).unwrap().nlink(), 2);
}
