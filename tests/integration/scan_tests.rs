use dupfind::duplicates::{DuplicateFinder, FinderConfig, WastedSpace};
use dupfind::scanner::{HashAlgorithm, WalkerConfig, Walker};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write_file(root: &Path, relative: &str, content: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(&path).unwrap().write_all(content).unwrap();
    path
}

fn group_paths(finder: &DuplicateFinder, root: &Path) -> Vec<BTreeSet<PathBuf>> {
    let report = finder.find_duplicates(root).unwrap();
    let (index, _) = report.index();
    let mut groups: Vec<BTreeSet<PathBuf>> = index
        .duplicate_groups()
        .iter()
        .map(|g| g.files.iter().map(|f| f.path.clone()).collect())
        .collect();
    groups.sort();
    groups
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let report = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let (index, _) = report.index();
    let summary = report.summary(&index, None);

    assert!(index.duplicate_groups().is_empty());
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.wasted_bytes, 0);
}

#[test]
fn test_scan_hello_world_scenario() {
    let dir = tempdir().unwrap();
    let a = write_file(dir.path(), "a", b"hello");
    let b = write_file(dir.path(), "b", b"hello");
    write_file(dir.path(), "c", b"world");

    let report = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let (index, _) = report.index();
    let summary = report.summary(&index, None);

    let groups = index.duplicate_groups();
    assert_eq!(groups.len(), 1);
    let members: BTreeSet<_> = groups[0].files.iter().map(|f| f.path.clone()).collect();
    assert_eq!(members, BTreeSet::from([a, b]));
    assert_eq!(
        groups[0].digest.to_hex(),
        "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
    );

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.hashed_files, 3);
    assert_eq!(summary.wasted_bytes, 10);
    assert_eq!(index.unique_count(), 1);
}

#[test]
fn test_scan_all_unique() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "a.txt", b"content a");
    write_file(dir.path(), "b.txt", b"content b");
    write_file(dir.path(), "c.txt", b"content c");

    let report = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let (index, _) = report.index();
    let summary = report.summary(&index, None);

    assert!(index.duplicate_groups().is_empty());
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.duplicate_groups, 0);
    assert_eq!(summary.wasted_bytes, 0);
}

#[test]
fn test_scan_nested_directories() {
    let dir = tempdir().unwrap();
    let top = write_file(dir.path(), "a.txt", b"nested duplicate");
    let deep = write_file(dir.path(), "one/two/three/b.txt", b"nested duplicate");
    write_file(dir.path(), "one/c.txt", b"other");

    let groups = group_paths(&DuplicateFinder::with_defaults(), dir.path());
    assert_eq!(groups, vec![BTreeSet::from([top, deep])]);
}

#[test]
fn test_walker_finds_every_regular_file() {
    let dir = tempdir().unwrap();
    let mut expected = BTreeSet::new();
    for (i, rel) in ["x", "d1/y", "d1/d2/z", "d3/w", "d3/d4/d5/v"].iter().enumerate() {
        expected.insert(write_file(dir.path(), rel, format!("{}", i).as_bytes()));
    }
    fs::create_dir_all(dir.path().join("empty/dir")).unwrap();

    let (files, stats) = Walker::new(dir.path(), WalkerConfig::default()).walk().unwrap();
    let found: BTreeSet<PathBuf> = files.iter().map(|f| f.path.clone()).collect();

    assert_eq!(found, expected);
    assert_eq!(stats.files_found, 5);
    assert!(stats.errors.is_empty());
    for record in files.iter() {
        assert_eq!(record.size, fs::metadata(&record.path).unwrap().len());
        assert!(record.is_pending());
    }
}

#[test]
fn test_scan_empty_files_form_a_group() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "empty1", b"");
    write_file(dir.path(), "empty2", b"");

    let report = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let (index, _) = report.index();
    let summary = report.summary(&index, None);

    assert_eq!(summary.duplicate_groups, 1);
    assert_eq!(summary.wasted_bytes, 0);
}

#[test]
fn test_scan_skip_empty() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "empty1", b"");
    write_file(dir.path(), "empty2", b"");

    let config = FinderConfig::default()
        .with_walker_config(WalkerConfig::default().with_skip_empty(true));
    let report = DuplicateFinder::new(config).find_duplicates(dir.path()).unwrap();

    assert!(report.files.is_empty());
}

#[test]
fn test_scan_same_groups_for_every_algorithm() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "a", b"alpha");
    write_file(dir.path(), "b", b"alpha");
    write_file(dir.path(), "c", b"beta");
    write_file(dir.path(), "d", b"beta");
    write_file(dir.path(), "e", b"gamma");

    let baseline = group_paths(&DuplicateFinder::with_defaults(), dir.path());
    assert_eq!(baseline.len(), 2);

    for algorithm in [HashAlgorithm::Sha256, HashAlgorithm::Blake3] {
        let finder = DuplicateFinder::new(FinderConfig::default().with_algorithm(algorithm));
        assert_eq!(group_paths(&finder, dir.path()), baseline);

        let report = finder.find_duplicates(dir.path()).unwrap();
        let (index, _) = report.index();
        for group in index.duplicate_groups() {
            assert_eq!(group.digest.len(), algorithm.digest_len());
        }
    }
}

#[test]
fn test_scan_large_file_crosses_buffer_boundaries() {
    let dir = tempdir().unwrap();
    let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    write_file(dir.path(), "big1", &content);
    write_file(dir.path(), "big2", &content);
    let mut altered = content.clone();
    altered[150_000] ^= 1;
    write_file(dir.path(), "big3", &altered);

    let finder = DuplicateFinder::new(FinderConfig::default().with_buffer_size(4096));
    let groups = group_paths(&finder, dir.path());

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert!(!groups[0].contains(&dir.path().join("big3")));
}

#[test]
fn test_scan_reclaimable_and_all_copies() {
    let dir = tempdir().unwrap();
    for name in ["a", "b", "c"] {
        write_file(dir.path(), name, b"0123456789");
    }
    write_file(dir.path(), "d", b"xyz");
    write_file(dir.path(), "e", b"xyz");

    let all = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let (index, _) = all.index();
    assert_eq!(all.summary(&index, None).wasted_bytes, 36);
    assert_eq!(index.wasted_bytes(WastedSpace::Reclaimable), 23);
}

#[test]
fn test_scan_with_verify_keeps_groups() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "a", b"same bytes");
    write_file(dir.path(), "b", b"same bytes");
    write_file(dir.path(), "c", b"same bytes");

    let finder = DuplicateFinder::new(FinderConfig::default().with_verify(true));
    let report = finder.find_duplicates(dir.path()).unwrap();
    let (index, verify_stats) = report.index();
    let verify_stats = verify_stats.unwrap();

    assert_eq!(verify_stats.compared_files, 2);
    assert!(verify_stats.collisions.is_empty());
    assert_eq!(index.duplicate_groups()[0].len(), 3);
}

#[test]
fn test_scan_filters() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "small1", b"ab");
    write_file(dir.path(), "small2", b"ab");
    write_file(dir.path(), "big1", &[7u8; 100]);
    write_file(dir.path(), "big2", &[7u8; 100]);
    write_file(dir.path(), ".hidden/big3", &[7u8; 100]);
    write_file(dir.path(), "skip.tmp", &[7u8; 100]);

    let walker_config = WalkerConfig::default()
        .with_size_bounds(Some(10), None)
        .with_skip_hidden(true)
        .with_ignore_patterns(vec!["*.tmp".to_string()]);
    let finder = DuplicateFinder::new(FinderConfig::default().with_walker_config(walker_config));
    let groups = group_paths(&finder, dir.path());

    assert_eq!(
        groups,
        vec![BTreeSet::from([
            dir.path().join("big1"),
            dir.path().join("big2")
        ])]
    );
}

#[test]
fn test_scan_does_not_modify_files() {
    let dir = tempdir().unwrap();
    let a = write_file(dir.path(), "a", b"keep me");
    let b = write_file(dir.path(), "b", b"keep me");
    let before = fs::metadata(&a).unwrap().modified().unwrap();

    let report = DuplicateFinder::new(FinderConfig::default().with_verify(true))
        .find_duplicates(dir.path())
        .unwrap();
    let _ = report.index();

    assert_eq!(fs::read(&a).unwrap(), b"keep me");
    assert_eq!(fs::read(&b).unwrap(), b"keep me");
    assert_eq!(fs::metadata(&a).unwrap().modified().unwrap(), before);
}

#[test]
fn test_scan_ignores_gitignore_files_in_tree() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), ".gitignore", b"*.txt\n");
    let a = write_file(dir.path(), "a.txt", b"hello");
    let b = write_file(dir.path(), "b.txt", b"hello");
    write_file(dir.path(), "nested/.gitignore", b"*\n");
    let c = write_file(dir.path(), "nested/c.txt", b"hello");

    let groups = group_paths(&DuplicateFinder::with_defaults(), dir.path());
    assert_eq!(groups, vec![BTreeSet::from([a, b, c])]);
}
