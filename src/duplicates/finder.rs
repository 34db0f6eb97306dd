//! Duplicate finder: the pipeline driver.
//!
//! # Overview
//!
//! This module orchestrates the detection pipeline:
//! 1. **Walk** - Collect every regular file under the root into a [`FileCollection`]
//! 2. **Hash** - Stream each file through the configured digest on a bounded pool
//! 3. **Index** - Group hashed records by digest (see [`crate::duplicates::groups`])
//!
//! The finder owns the collection and hands it back inside a [`ScanReport`].
//! The index is built from the report and borrows it.
//!
//! # Example
//!
//! ```no_run
//! use dupfind::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default().with_io_threads(4));
//! let report = finder.find_duplicates(Path::new(".")).unwrap();
//! let (index, verify_stats) = report.index();
//! let summary = report.summary(&index, verify_stats.as_ref());
//!
//! for group in index.sorted_groups() {
//!     println!("{}: {} files", group.digest, group.len());
//! }
//! println!("{} bytes wasted", summary.wasted_bytes);
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::groups::{DuplicateIndex, VerifyStats, WastedSpace};
use crate::progress::ProgressCallback;
use crate::scanner::{
    hash_all, FileCollection, HashAlgorithm, HashConfig, HashError, HashStats, Hasher,
    ScanError, WalkStats, Walker, WalkerConfig,
};

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Digest algorithm.
    pub algorithm: HashAlgorithm,
    /// Upper bound on concurrent hash workers. Default is 4.
    pub io_threads: usize,
    /// Read buffer size for hashing and verification.
    pub buffer_size: usize,
    /// Byte-by-byte verification of every group after hashing.
    pub verify: bool,
    /// Definition of wasted bytes used in the summary.
    pub wasted_space: WastedSpace,
    /// Fail on the first per-entry walk or hash error.
    pub strict: bool,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("walker_config", &self.walker_config)
            .field("algorithm", &self.algorithm)
            .field("io_threads", &self.io_threads)
            .field("buffer_size", &self.buffer_size)
            .field("verify", &self.verify)
            .field("wasted_space", &self.wasted_space)
            .field("strict", &self.strict)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            walker_config: WalkerConfig::default(),
            algorithm: HashAlgorithm::default(),
            io_threads: 4,
            buffer_size: crate::scanner::hasher::DEFAULT_BUFFER_SIZE,
            verify: false,
            wasted_space: WastedSpace::default(),
            strict: false,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the hash worker bound (minimum 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the read buffer size (minimum 1).
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Enable byte-by-byte verification of duplicate groups.
    #[must_use]
    pub fn with_verify(mut self, enabled: bool) -> Self {
        self.verify = enabled;
        self
    }

    /// Set the wasted space definition.
    #[must_use]
    pub fn with_wasted_space(mut self, mode: WastedSpace) -> Self {
        self.wasted_space = mode;
        self
    }

    /// Set fail-fast on any per-entry error.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Total number of files discovered
    pub total_files: usize,
    /// Total size of all discovered files in bytes
    pub total_size: u64,
    /// Files that received a digest
    pub hashed_files: usize,
    /// Files that could not be hashed
    pub failed_files: usize,
    /// Bytes streamed through the digest
    pub bytes_hashed: u64,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Number of duplicate copies (excluding one original per group)
    pub duplicate_files: usize,
    /// Wasted bytes under `wasted_space`
    pub wasted_bytes: u64,
    /// Definition used for `wasted_bytes`
    pub wasted_space: WastedSpace,
    /// Digest algorithm used
    pub algorithm: HashAlgorithm,
    /// Members removed by the verification pass
    pub collisions: usize,
    /// Per-entry warnings (walk, hash and verification)
    pub warnings: usize,
    /// Duration of walk and hash stages
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Percentage of scanned bytes counted as wasted.
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.wasted_bytes as f64 / self.total_size as f64) * 100.0
        }
    }

    /// Wasted bytes as a human-readable string.
    #[must_use]
    pub fn wasted_display(&self) -> String {
        bytesize::ByteSize::b(self.wasted_bytes).to_string()
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The root could not be walked, or a walk warning in strict mode.
    #[error(transparent)]
    Traversal(#[from] ScanError),

    /// A file could not be hashed in strict mode.
    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Result of the walk and hash stages.
///
/// Owns the [`FileCollection`]. Build the [`DuplicateIndex`] with
/// [`ScanReport::index`].
pub struct ScanReport {
    /// Root directory that was scanned (empty for pre-collected files)
    pub root: PathBuf,
    /// Every discovered file with its digest state
    pub files: FileCollection,
    /// Traversal statistics and warnings
    pub walk_stats: WalkStats,
    /// Hashing statistics and per-file failures
    pub hash_stats: HashStats,
    /// Duration of walk and hash stages
    pub scan_duration: Duration,
    hasher: Hasher,
    verify: bool,
    wasted_space: WastedSpace,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for ScanReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanReport")
            .field("root", &self.root)
            .field("files", &self.files.len())
            .field("walk_stats", &self.walk_stats)
            .field("hash_stats", &self.hash_stats)
            .field("scan_duration", &self.scan_duration)
            .field("verify", &self.verify)
            .field("wasted_space", &self.wasted_space)
            .finish()
    }
}

impl ScanReport {
    /// Build the duplicate index, running the verification pass if enabled.
    #[must_use]
    pub fn index(&self) -> (DuplicateIndex<'_>, Option<VerifyStats>) {
        let mut index = DuplicateIndex::build(&self.files);
        let verify_stats = self
            .verify
            .then(|| index.verify(&self.hasher, self.progress_callback.as_ref()));
        (index, verify_stats)
    }

    /// Summary for `index`, which must have been built from this report.
    #[must_use]
    pub fn summary(
        &self,
        index: &DuplicateIndex<'_>,
        verify_stats: Option<&VerifyStats>,
    ) -> ScanSummary {
        let (collisions, verify_errors) =
            verify_stats.map_or((0, 0), |v| (v.collisions.len(), v.errors.len()));

        ScanSummary {
            total_files: self.files.len(),
            total_size: self.files.total_size(),
            hashed_files: self.hash_stats.hashed_files,
            failed_files: self.hash_stats.failed_files,
            bytes_hashed: self.hash_stats.bytes_hashed,
            duplicate_groups: index.group_count(),
            duplicate_files: index.duplicate_file_count(),
            wasted_bytes: index.wasted_bytes(self.wasted_space),
            wasted_space: self.wasted_space,
            algorithm: self.hasher.algorithm(),
            collisions,
            warnings: self.walk_stats.errors.len() + self.hash_stats.errors.len() + verify_errors,
            scan_duration: self.scan_duration,
        }
    }

    /// Whether any per-entry warning was recorded.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.walk_stats.errors.is_empty() || !self.hash_stats.errors.is_empty()
    }
}

/// Duplicate finder that runs the walk → hash pipeline.
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Hasher,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let mut hasher = Hasher::new(config.algorithm).with_buffer_size(config.buffer_size);
        if let Some(ref flag) = config.shutdown_flag {
            hasher = hasher.with_shutdown_flag(Arc::clone(flag));
        }
        Self { config, hasher }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The finder's configuration.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Walk `path` and hash every discovered file.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if:
    /// - The path does not exist, is not a directory, or cannot be read
    /// - The scan is interrupted by shutdown signal
    /// - `strict` is set and any entry fails to walk or hash
    pub fn find_duplicates(&self, path: &Path) -> Result<ScanReport, FinderError> {
        let start_time = Instant::now();

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        log::info!("Starting duplicate scan of {}", path.display());

        let mut walker = Walker::new(path, self.config.walker_config.clone());
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref callback) = self.config.progress_callback {
            walker = walker.with_progress_callback(Arc::clone(callback));
        }

        let (files, mut walk_stats) = walker.walk()?;

        if walk_stats.interrupted || self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }
        if self.config.strict && !walk_stats.errors.is_empty() {
            return Err(FinderError::Traversal(walk_stats.errors.swap_remove(0)));
        }

        log::info!(
            "Found {} files ({})",
            files.len(),
            bytesize::ByteSize::b(files.total_size())
        );

        self.hash_collection(path.to_path_buf(), files, walk_stats, start_time)
    }

    /// Hash a pre-collected list of files.
    ///
    /// Use this method when the files come from another source than the
    /// walker. Records that already carry a digest state are kept as-is.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` on shutdown, or on the first hash error in
    /// strict mode.
    pub fn find_duplicates_from_files(
        &self,
        files: FileCollection,
    ) -> Result<ScanReport, FinderError> {
        let start_time = Instant::now();
        let walk_stats = WalkStats {
            files_found: files.len(),
            ..Default::default()
        };
        self.hash_collection(PathBuf::new(), files, walk_stats, start_time)
    }

    fn hash_collection(
        &self,
        root: PathBuf,
        mut files: FileCollection,
        walk_stats: WalkStats,
        start_time: Instant,
    ) -> Result<ScanReport, FinderError> {
        let mut hash_config = HashConfig::default().with_io_threads(self.config.io_threads);
        if let Some(ref callback) = self.config.progress_callback {
            hash_config = hash_config.with_progress_callback(Arc::clone(callback));
        }

        let mut hash_stats = hash_all(&mut files, &self.hasher, &hash_config);

        if hash_stats.interrupted || self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }
        if self.config.strict && !hash_stats.errors.is_empty() {
            return Err(FinderError::Hash(hash_stats.errors.swap_remove(0)));
        }

        let scan_duration = start_time.elapsed();
        log::info!(
            "Scan complete: {} files hashed, {} failed in {:.2?}",
            hash_stats.hashed_files,
            hash_stats.failed_files,
            scan_duration
        );

        Ok(ScanReport {
            root,
            files,
            walk_stats,
            hash_stats,
            scan_duration,
            hasher: self.hasher.clone(),
            verify: self.config.verify,
            wasted_space: self.config.wasted_space,
            progress_callback: self.config.progress_callback.clone(),
        })
    }
}
