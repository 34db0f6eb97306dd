//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a directory tree
//! and collecting every regular file into a [`FileCollection`]. Traversal is
//! depth-first on a single thread. walkdir keeps an explicit stack instead of
//! recursing, so deeply nested trees cannot exhaust the call stack, and the
//! number of simultaneously open directory handles is capped.
//!
//! # Features
//!
//! - Symlinks, devices, sockets and fifos are skipped, never followed
//! - Unreadable subdirectories and vanished entries become warnings
//! - Gitignore-style `ignore_patterns` via the `ignore` crate
//! - Size filtering (min/max) and hidden/empty file filtering
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use dupfind::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     skip_hidden: true,
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), config);
//! let (files, stats) = walker.walk().expect("root must be a readable directory");
//! println!("{} files, {} warnings", files.len(), stats.errors.len());
//! ```

use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use walkdir::{DirEntry, WalkDir};

use super::{FileCollection, FileRecord, ScanError, WalkerConfig};
use crate::progress::ProgressCallback;

/// Maximum number of directory handles held open at once.
pub const MAX_OPEN_DIRS: usize = 32;

/// Statistics and warnings from a walk.
#[derive(Debug, Default)]
pub struct WalkStats {
    /// Regular files added to the collection
    pub files_found: usize,
    /// Directories descended into (excluding the root)
    pub dirs_visited: usize,
    /// Symbolic links skipped
    pub symlinks_skipped: usize,
    /// Devices, sockets and fifos skipped
    pub special_skipped: usize,
    /// Regular files excluded by size, hidden, empty or ignore filters
    pub filtered: usize,
    /// Per-entry failures that were skipped
    pub errors: Vec<ScanError>,
    /// Whether the walk stopped on a shutdown request
    pub interrupted: bool,
}

/// Directory walker for file discovery.
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Walker {
    /// Create a new walker for the given path.
    ///
    /// # Arguments
    ///
    /// * `path` - Root directory to scan
    /// * `config` - Walker configuration options
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops before the next
    /// entry and marks the stats as interrupted.
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

    /// Root directory of this walker.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Build a gitignore-style matcher from the configured patterns.
    ///
    /// Only explicit patterns apply; `.gitignore` files in the tree are
    /// ordinary files to this walker.
    fn build_ignore_matcher(&self) -> Option<Gitignore> {
        if self.config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if gitignore.is_empty() => None,
            Ok(gitignore) => Some(gitignore),
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    fn should_ignore(&self, path: &Path, is_dir: bool, gitignore: Option<&Gitignore>) -> bool {
        let Some(gi) = gitignore else {
            return false;
        };
        let relative_path = path.strip_prefix(&self.root).unwrap_or(path);
        gi.matched(relative_path, is_dir).is_ignore()
    }

    fn is_hidden(entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with('.'))
    }

    /// Directory pruning predicate; files are filtered later so they can be counted.
    fn descend_into(&self, entry: &DirEntry, gitignore: Option<&Gitignore>) -> bool {
        if !entry.file_type().is_dir() || entry.depth() == 0 {
            return true;
        }
        if self.config.skip_hidden && Self::is_hidden(entry) {
            log::trace!("Skipping hidden directory: {}", entry.path().display());
            return false;
        }
        if self.should_ignore(entry.path(), true, gitignore) {
            log::trace!("Ignoring directory: {}", entry.path().display());
            return false;
        }
        true
    }

    fn passes_size_filter(&self, size: u64) -> bool {
        if self.config.skip_empty && size == 0 {
            return false;
        }
        if self.config.min_size.is_some_and(|min| size < min) {
            return false;
        }
        if self.config.max_size.is_some_and(|max| size > max) {
            return false;
        }
        true
    }

    /// Check that the root can be opened as a directory.
    fn check_root(&self) -> Result<(), ScanError> {
        let metadata =
            fs::metadata(&self.root).map_err(|e| ScanError::from_io(&self.root, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }
        // The handle is dropped right away; walkdir opens its own.
        fs::read_dir(&self.root).map_err(|e| ScanError::from_io(&self.root, e))?;
        Ok(())
    }

    /// Walk the directory tree and collect every regular file.
    ///
    /// # Errors
    ///
    /// Returns a [`ScanError`] only if the root itself cannot be opened as a
    /// directory. Failures below the root are recorded in
    /// [`WalkStats::errors`] and the walk continues.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dupfind::scanner::{Walker, WalkerConfig};
    /// use std::path::Path;
    ///
    /// let walker = Walker::new(Path::new("."), WalkerConfig::default());
    /// let (files, _stats) = walker.walk().unwrap();
    /// println!("Found {} files", files.len());
    /// ```
    pub fn walk(&self) -> Result<(FileCollection, WalkStats), ScanError> {
        self.check_root()?;

        let gitignore = self.build_ignore_matcher();
        let mut files = FileCollection::new();
        let mut stats = WalkStats::default();

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start("walking", 0);
        }

        let mut walk_dir = WalkDir::new(&self.root)
            .follow_links(false)
            .max_open(MAX_OPEN_DIRS);
        if self.config.sort_entries {
            walk_dir = walk_dir.sort_by_file_name();
        }

        let entries = walk_dir
            .into_iter()
            .filter_entry(|entry| self.descend_into(entry, gitignore.as_ref()));

        for entry_result in entries {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping iteration");
                stats.interrupted = true;
                break;
            }

            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let fatal = e.depth() == 0;
                    let err = self.convert_walk_error(e);
                    if fatal {
                        return Err(err);
                    }
                    log::warn!("Skipping unreadable entry: {}", err);
                    stats.errors.push(err);
                    continue;
                }
            };

            if entry.depth() == 0 {
                continue;
            }

            let file_type = entry.file_type();
            if file_type.is_dir() {
                stats.dirs_visited += 1;
                continue;
            }
            if file_type.is_symlink() {
                log::trace!("Skipping symlink: {}", entry.path().display());
                stats.symlinks_skipped += 1;
                continue;
            }
            if !file_type.is_file() {
                log::trace!("Skipping special file: {}", entry.path().display());
                stats.special_skipped += 1;
                continue;
            }

            // Size is captured here once and never re-checked.
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    let err = self.convert_walk_error(e);
                    log::warn!("Skipping vanished file: {}", err);
                    stats.errors.push(err);
                    continue;
                }
            };

            if let Some(record) = self.process_file_entry(&entry, &metadata, gitignore.as_ref()) {
                stats.files_found += 1;
                if let Some(ref callback) = self.progress_callback {
                    callback.on_progress(stats.files_found, &record.path.to_string_lossy());
                }
                files.push(record);
            } else {
                stats.filtered += 1;
            }
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end("walking");
        }

        log::debug!(
            "Walk of {} complete: {} files, {} directories, {} warnings",
            self.root.display(),
            stats.files_found,
            stats.dirs_visited,
            stats.errors.len()
        );

        Ok((files, stats))
    }

    /// Apply file filters and build the record.
    fn process_file_entry(
        &self,
        entry: &DirEntry,
        metadata: &Metadata,
        gitignore: Option<&Gitignore>,
    ) -> Option<FileRecord> {
        let path = entry.path();
        let size = metadata.len();

        if self.config.skip_hidden && Self::is_hidden(entry) {
            log::trace!("Skipping hidden file: {}", path.display());
            return None;
        }

        if self.should_ignore(path, false, gitignore) {
            log::trace!("Ignoring file: {}", path.display());
            return None;
        }

        if !self.passes_size_filter(size) {
            log::trace!(
                "Skipping file due to size filter ({}): {}",
                size,
                path.display()
            );
            return None;
        }

        Some(FileRecord::new(path.to_path_buf(), size))
    }

    fn convert_walk_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        match error.into_io_error() {
            Some(io) => ScanError::from_io(&path, io),
            None => ScanError::Io {
                path,
                source: std::io::Error::other("filesystem loop detected"),
            },
        }
    }
}
