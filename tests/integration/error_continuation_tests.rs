use dupfind::duplicates::{DuplicateFinder, FinderConfig, FinderError};
use dupfind::progress::ProgressCallback;
use dupfind::scanner::{
    hash_all, DigestState, FileCollection, FileRecord, HashConfig, HashError, Hasher, ScanError,
    Walker, WalkerConfig,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

fn write_file(root: &Path, relative: &str, content: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Deletes a directory as soon as the walker reports its first file, so a
/// sorted walk finds it listed but cannot open it.
struct RemoveDirOnFirstFile {
    target: PathBuf,
    removed: AtomicBool,
}

impl ProgressCallback for RemoveDirOnFirstFile {
    fn on_phase_start(&self, _phase: &str, _total: usize) {}

    fn on_progress(&self, _current: usize, _path: &str) {
        if !self.removed.swap(true, Ordering::SeqCst) {
            fs::remove_dir_all(&self.target).unwrap();
        }
    }

    fn on_phase_end(&self, _phase: &str) {}
}

fn vanishing_dir_config(target: PathBuf) -> FinderConfig {
    FinderConfig::default()
        .with_walker_config(WalkerConfig::default().with_sort_entries(true))
        .with_progress_callback(Arc::new(RemoveDirOnFirstFile {
            target,
            removed: AtomicBool::new(false),
        }))
}

#[test]
fn test_find_duplicates_from_files_continues_on_error() {
    let files: FileCollection = vec![
        FileRecord::new(PathBuf::from("nonexistent_1.txt"), 100),
        FileRecord::new(PathBuf::from("nonexistent_2.txt"), 100),
    ]
    .into_iter()
    .collect();

    let report = DuplicateFinder::with_defaults()
        .find_duplicates_from_files(files)
        .unwrap();
    let (index, _) = report.index();

    assert!(index.duplicate_groups().is_empty());
    assert_eq!(report.hash_stats.errors.len(), 2);
    for err in &report.hash_stats.errors {
        match err {
            HashError::NotFound(_) => {}
            other => panic!("Expected NotFound HashError, got: {:?}", other),
        }
    }
    for record in report.files.iter() {
        assert_eq!(record.digest_state(), &DigestState::Failed);
    }
}

#[test]
fn test_file_deleted_between_discovery_and_hashing() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "a", b"hello");
    write_file(dir.path(), "b", b"hello");
    let gone = write_file(dir.path(), "c", b"hello");

    let (mut files, _) = Walker::new(dir.path(), WalkerConfig::default())
        .walk()
        .unwrap();
    assert_eq!(files.len(), 3);
    fs::remove_file(&gone).unwrap();

    let stats = hash_all(&mut files, &Hasher::default(), &HashConfig::default());
    assert_eq!(stats.hashed_files, 2);
    assert_eq!(stats.failed_files, 1);
    assert!(matches!(&stats.errors[0], HashError::NotFound(p) if p == &gone));
    assert_eq!(
        files.find(&gone).unwrap().digest_state(),
        &DigestState::Failed
    );

    let report = DuplicateFinder::with_defaults()
        .find_duplicates_from_files(files)
        .unwrap();
    let (index, _) = report.index();
    let groups = index.duplicate_groups();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert!(groups[0].files.iter().all(|f| f.path != gone));
    assert_eq!(report.summary(&index, None).wasted_bytes, 10);
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing");

    let result = DuplicateFinder::with_defaults().find_duplicates(&missing);
    match result {
        Err(FinderError::Traversal(ScanError::NotFound(path))) => assert_eq!(path, missing),
        other => panic!("Expected NotFound traversal error, got: {:?}", other),
    }
}

#[test]
fn test_root_is_a_file_is_fatal() {
    let dir = tempdir().unwrap();
    let file = write_file(dir.path(), "file.txt", b"x");

    let result = DuplicateFinder::with_defaults().find_duplicates(&file);
    assert!(matches!(
        result,
        Err(FinderError::Traversal(ScanError::NotADirectory(_)))
    ));
}

#[test]
fn test_vanished_subdirectory_is_skipped() {
    let dir = tempdir().unwrap();
    let a = write_file(dir.path(), "a", b"dup");
    write_file(dir.path(), "b/inner", b"dup");
    let c = write_file(dir.path(), "c", b"dup");
    let sub = dir.path().join("b");

    let report = DuplicateFinder::new(vanishing_dir_config(sub.clone()))
        .find_duplicates(dir.path())
        .unwrap();
    let (index, _) = report.index();

    assert_eq!(report.walk_stats.errors.len(), 1);
    assert!(matches!(&report.walk_stats.errors[0], ScanError::NotFound(p) if p == &sub));
    assert!(report.has_warnings());
    assert_eq!(report.summary(&index, None).warnings, 1);

    let groups = index.duplicate_groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].paths(), vec![a.as_path(), c.as_path()]);
}

#[test]
fn test_vanished_subdirectory_strict_fails() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "a", b"x");
    write_file(dir.path(), "b/inner", b"x");
    let sub = dir.path().join("b");

    let finder = DuplicateFinder::new(vanishing_dir_config(sub.clone()).with_strict(true));
    match finder.find_duplicates(dir.path()) {
        Err(FinderError::Traversal(ScanError::NotFound(path))) => assert_eq!(path, sub),
        other => panic!("Expected NotFound traversal error, got: {:?}", other),
    }
}

#[cfg(unix)]
mod unix {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Remove all permissions from `path`. Panics when the process can still
    /// read it (e.g. running as root), so these tests never pass vacuously.
    fn make_unreadable(path: &Path) {
        fs::set_permissions(path, fs::Permissions::from_mode(0o000)).unwrap();
        let readable = if path.is_dir() {
            fs::read_dir(path).is_ok()
        } else {
            fs::File::open(path).is_ok()
        };
        if readable {
            restore(path);
            panic!("permissions are not enforced for this user; run these tests unprivileged");
        }
    }

    fn restore(path: &Path) {
        let mode = if path.is_dir() { 0o755 } else { 0o644 };
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(mode));
    }

    #[test]
    #[ignore = "needs an unprivileged user; run with --ignored"]
    fn test_unreadable_subdirectory_is_skipped() {
        let dir = tempdir().unwrap();
        let a = write_file(dir.path(), "a", b"dup");
        let b = write_file(dir.path(), "b", b"dup");
        write_file(dir.path(), "locked/inner", b"dup");
        let locked = dir.path().join("locked");

        make_unreadable(&locked);

        let report = DuplicateFinder::with_defaults().find_duplicates(dir.path());
        restore(&locked);
        let report = report.unwrap();
        let (index, _) = report.index();

        assert_eq!(report.walk_stats.errors.len(), 1);
        assert!(report.has_warnings());
        let groups = index.duplicate_groups();
        assert_eq!(groups.len(), 1);
        let mut members = groups[0].paths();
        members.sort();
        assert_eq!(members, vec![a.as_path(), b.as_path()]);
    }

    #[test]
    #[ignore = "needs an unprivileged user; run with --ignored"]
    fn test_unreadable_subdirectory_strict_fails() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "locked/inner", b"x");
        let locked = dir.path().join("locked");

        make_unreadable(&locked);

        let finder = DuplicateFinder::new(FinderConfig::default().with_strict(true));
        let result = finder.find_duplicates(dir.path());
        restore(&locked);

        assert!(matches!(result, Err(FinderError::Traversal(_))));
    }

    #[test]
    #[ignore = "needs an unprivileged user; run with --ignored"]
    fn test_unreadable_file_is_failed_not_grouped() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "a", b"same");
        write_file(dir.path(), "b", b"same");
        let secret = write_file(dir.path(), "secret", b"same");

        make_unreadable(&secret);

        let report = DuplicateFinder::with_defaults().find_duplicates(dir.path());
        restore(&secret);
        let report = report.unwrap();
        let (index, _) = report.index();

        assert_eq!(report.hash_stats.failed_files, 1);
        assert!(matches!(
            report.hash_stats.errors[0],
            HashError::PermissionDenied(_)
        ));
        assert_eq!(index.duplicate_groups()[0].len(), 2);
        assert_eq!(index.hashed_count(), 2);
    }
}
