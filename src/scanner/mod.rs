//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Single-threaded directory walking using walkdir
//! - Streaming content hashing (SHA-1, SHA-256, BLAKE3)
//! - The shared data model: [`FileRecord`], [`FileCollection`], [`Digest`]
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: Streaming file hashing and the bounded hashing pool
//!
//! # Example
//!
//! ```no_run
//! use dupfind::scanner::{hash_all, HashConfig, Hasher, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! let (mut files, walk_stats) = walker.walk().unwrap();
//! for warning in &walk_stats.errors {
//!     eprintln!("Warning: {}", warning);
//! }
//!
//! let hasher = Hasher::default();
//! let hash_stats = hash_all(&mut files, &hasher, &HashConfig::default());
//! println!("{} hashed, {} failed", hash_stats.hashed_files, hash_stats.failed_files);
//! ```

pub mod hasher;
pub mod walker;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

// Re-export main types
pub use hasher::{files_identical, hash_all, HashAlgorithm, HashConfig, HashStats, Hasher};
pub use walker::{WalkStats, Walker};

/// Opaque content digest.
///
/// The length depends on the [`HashAlgorithm`] that produced it and is never
/// assumed by the grouping code. Two digests are equal only when every byte
/// matches.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(Box<[u8]>);

impl Digest {
    /// Wrap raw digest bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Digest length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the digest holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowercase hexadecimal representation.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse a digest from a hexadecimal string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        Ok(Self(hex::decode(s)?.into_boxed_slice()))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Hashing state of a [`FileRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DigestState {
    /// Not hashed yet.
    #[default]
    Pending,
    /// Content digest computed from the full file.
    Computed(Digest),
    /// The file could not be read completely; excluded from grouping.
    Failed,
}

/// One regular file discovered during traversal.
///
/// Created by the walker with a pending digest and mutated exactly once by
/// the hasher. Read-only afterwards.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Path of the file, joined onto the walk root
    pub path: PathBuf,
    /// File size in bytes at traversal time
    pub size: u64,
    digest: DigestState,
}

impl FileRecord {
    /// Create a new record with a pending digest.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the file
    /// * `size` - File size in bytes
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            digest: DigestState::Pending,
        }
    }

    /// Current digest state.
    #[must_use]
    pub fn digest_state(&self) -> &DigestState {
        &self.digest
    }

    /// The computed digest, if hashing succeeded.
    #[must_use]
    pub fn digest(&self) -> Option<&Digest> {
        match &self.digest {
            DigestState::Computed(d) => Some(d),
            _ => None,
        }
    }

    /// Whether the record still waits for the hasher.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.digest == DigestState::Pending
    }

    /// Attach the hashing outcome.
    ///
    /// The state can leave `Pending` only once. Returns `false` and leaves
    /// the record untouched if it was already resolved or if `state` is
    /// itself `Pending`.
    pub fn attach_digest(&mut self, state: DigestState) -> bool {
        if !self.is_pending() || state == DigestState::Pending {
            return false;
        }
        self.digest = state;
        true
    }
}

/// Ordered collection of discovered files.
///
/// Insertion order is discovery order. The collection is the single owner of
/// every [`FileRecord`]; the duplicate index refers to records by position.
#[derive(Debug, Clone, Default)]
pub struct FileCollection {
    records: Vec<FileRecord>,
}

impl FileCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, record: FileRecord) {
        self.records.push(record);
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&FileRecord> {
        self.records.get(index)
    }

    /// Iterate over records in discovery order.
    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.records.iter()
    }

    /// Records as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[FileRecord] {
        &self.records
    }

    /// Mutable access for the hasher.
    pub(crate) fn records_mut(&mut self) -> &mut [FileRecord] {
        &mut self.records
    }

    /// Sum of all record sizes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.records.iter().map(|r| r.size).sum()
    }

    /// Find a record by path.
    #[must_use]
    pub fn find(&self, path: &Path) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.path == path)
    }
}

impl FromIterator<FileRecord> for FileCollection {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FileCollection {
    type Item = &'a FileRecord;
    type IntoIter = std::slice::Iter<'a, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Configuration for directory walking.
///
/// Controls filtering and ordering. Symlinks are never followed.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Skip zero-length files.
    pub skip_empty: bool,

    /// Minimum file size to include (in bytes).
    pub min_size: Option<u64>,

    /// Maximum file size to include (in bytes).
    pub max_size: Option<u64>,

    /// Glob patterns to ignore (gitignore-style).
    pub ignore_patterns: Vec<String>,

    /// Sort sibling entries by file name for reproducible discovery order.
    pub sort_entries: bool,
}

impl WalkerConfig {
    /// Set hidden file skipping.
    #[must_use]
    pub fn with_skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Set empty file skipping.
    #[must_use]
    pub fn with_skip_empty(mut self, skip: bool) -> Self {
        self.skip_empty = skip;
        self
    }

    /// Set size bounds.
    #[must_use]
    pub fn with_size_bounds(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_size = min;
        self.max_size = max;
        self
    }

    /// Set ignore patterns.
    #[must_use]
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Set sibling sorting.
    #[must_use]
    pub fn with_sort_entries(mut self, sort: bool) -> Self {
        self.sort_entries = sort;
        self
    }
}

/// Errors that can occur during directory scanning.
///
/// On the walk root these are fatal; anywhere else they are warnings.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(p) | Self::NotFound(p) | Self::NotADirectory(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Hashing stopped because shutdown was requested.
    #[error("Hashing interrupted: {0}")]
    Interrupted(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::Interrupted(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}
