//! Streaming file hasher.
//!
//! # Overview
//!
//! [`Hasher`] computes a content digest of a file by streaming it through
//! the configured [`HashAlgorithm`] in fixed-size chunks, so memory use is
//! bounded by the buffer size regardless of file size. Each call owns its
//! file handle and digest context; both are dropped on every exit path.
//!
//! [`hash_all`] runs the hasher over a [`FileCollection`] on a bounded rayon
//! pool, attaching a digest (or a failure marker) to every pending record.
//!
//! # Example
//!
//! ```no_run
//! use dupfind::scanner::{HashAlgorithm, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new(HashAlgorithm::Sha256);
//! let digest = hasher.hash_file(Path::new("Cargo.toml")).unwrap();
//! println!("{}", digest);
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::Digest as _;

use super::{Digest, DigestState, FileCollection, FileRecord, HashError};
use crate::progress::ProgressCallback;

/// Default read buffer size (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Files above this size are logged at debug level when hashed.
const LARGE_FILE_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Supported digest algorithms.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-1, 160-bit digest
    #[default]
    Sha1,
    /// SHA-256, 256-bit digest
    Sha256,
    /// BLAKE3, 256-bit digest
    Blake3,
}

impl HashAlgorithm {
    /// Name used in config files and reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }

    /// Digest length in bytes.
    #[must_use]
    pub fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 | Self::Blake3 => 32,
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call digest state. Never shared between files.
enum DigestContext {
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl DigestContext {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha1 => Self::Sha1(sha1::Sha1::new()),
            HashAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha1(ctx) => ctx.update(data),
            Self::Sha256(ctx) => ctx.update(data),
            Self::Blake3(ctx) => {
                ctx.update(data);
            }
        }
    }

    fn finalize(self) -> Digest {
        match self {
            Self::Sha1(ctx) => Digest::from_bytes(&ctx.finalize()),
            Self::Sha256(ctx) => Digest::from_bytes(&ctx.finalize()),
            Self::Blake3(ctx) => Digest::from_bytes(ctx.finalize().as_bytes()),
        }
    }
}

/// Streaming content hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    algorithm: HashAlgorithm,
    buffer_size: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

impl Hasher {
    /// Create a hasher for `algorithm` with the default buffer size.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            buffer_size: DEFAULT_BUFFER_SIZE,
            shutdown_flag: None,
        }
    }

    /// Set the read buffer size (minimum 1 byte).
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Set the shutdown flag checked between chunks.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// The configured algorithm.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The configured buffer size.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Digest of an in-memory buffer.
    #[must_use]
    pub fn hash_bytes(&self, data: &[u8]) -> Digest {
        let mut ctx = DigestContext::new(self.algorithm);
        ctx.update(data);
        ctx.finalize()
    }

    /// Digest of everything `reader` yields.
    ///
    /// # Errors
    ///
    /// Returns the first read error; no digest is produced from a partial read.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> io::Result<Digest> {
        let mut ctx = DigestContext::new(self.algorithm);
        let mut buffer = vec![0u8; self.buffer_size];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => ctx.update(&buffer[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(ctx.finalize())
    }

    /// Digest of the full content of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] if the file cannot be opened or read to the
    /// end, or if shutdown is requested while streaming.
    pub fn hash_file(&self, path: &Path) -> Result<Digest, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let reader = Interruptible {
            inner: file,
            flag: self.shutdown_flag.as_deref(),
        };

        self.hash_reader(reader).map_err(|e| {
            if e.get_ref().is_some_and(|inner| inner.is::<ShutdownRequested>()) {
                HashError::Interrupted(path.to_path_buf())
            } else {
                HashError::from_io(path, e)
            }
        })
    }
}

/// Raised by [`Interruptible`] once shutdown has been requested.
#[derive(Debug, thiserror::Error)]
#[error("shutdown requested")]
struct ShutdownRequested;

/// Reader that fails before the next chunk once the shutdown flag is set.
struct Interruptible<'a, R> {
    inner: R,
    flag: Option<&'a AtomicBool>,
}

impl<R: Read> Read for Interruptible<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.flag.is_some_and(|f| f.load(Ordering::SeqCst)) {
            return Err(io::Error::other(ShutdownRequested));
        }
        self.inner.read(buf)
    }
}

/// Fill `buf` as far as the reader allows. Returns bytes read (short only at EOF).
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Byte-by-byte comparison of two files.
///
/// # Errors
///
/// Returns a [`HashError`] naming whichever file could not be read.
pub fn files_identical(a: &Path, b: &Path, buffer_size: usize) -> Result<bool, HashError> {
    let mut file_a = File::open(a).map_err(|e| HashError::from_io(a, e))?;
    let mut file_b = File::open(b).map_err(|e| HashError::from_io(b, e))?;

    let len_a = file_a.metadata().map_err(|e| HashError::from_io(a, e))?.len();
    let len_b = file_b.metadata().map_err(|e| HashError::from_io(b, e))?.len();
    if len_a != len_b {
        return Ok(false);
    }

    let size = buffer_size.max(1);
    let mut buf_a = vec![0u8; size];
    let mut buf_b = vec![0u8; size];
    loop {
        let n_a = read_full(&mut file_a, &mut buf_a).map_err(|e| HashError::from_io(a, e))?;
        let n_b = read_full(&mut file_b, &mut buf_b).map_err(|e| HashError::from_io(b, e))?;
        if n_a != n_b || buf_a[..n_a] != buf_b[..n_b] {
            return Ok(false);
        }
        if n_a == 0 {
            return Ok(true);
        }
    }
}

/// Configuration for [`hash_all`].
#[derive(Clone)]
pub struct HashConfig {
    /// Upper bound on concurrent hash workers.
    pub io_threads: usize,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for HashConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashConfig")
            .field("io_threads", &self.io_threads)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            io_threads: 4,
            progress_callback: None,
        }
    }
}

impl HashConfig {
    /// Set the worker bound (minimum 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }
}

/// Statistics from the hashing stage.
#[derive(Debug, Default)]
pub struct HashStats {
    /// Pending records that entered the stage
    pub input_files: usize,
    /// Records that received a digest
    pub hashed_files: usize,
    /// Records marked as failed
    pub failed_files: usize,
    /// Total size of successfully hashed files
    pub bytes_hashed: u64,
    /// Per-file failures
    pub errors: Vec<HashError>,
    /// Whether hashing stopped on a shutdown request
    pub interrupted: bool,
}

enum HashOutcome {
    Hashed(u64),
    Failed(HashError),
    Interrupted,
}

fn hash_record(
    record: &mut FileRecord,
    hasher: &Hasher,
    config: &HashConfig,
    completed: &AtomicUsize,
) -> HashOutcome {
    if hasher.is_shutdown_requested() {
        return HashOutcome::Interrupted;
    }

    if record.size > LARGE_FILE_THRESHOLD {
        log::debug!(
            "Hashing large file ({} MB): {}",
            record.size / (1024 * 1024),
            record.path.display()
        );
    }

    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
    if let Some(ref callback) = config.progress_callback {
        callback.on_progress(done, &record.path.to_string_lossy());
    }

    match hasher.hash_file(&record.path) {
        Ok(digest) => {
            log::trace!("Hashed {}: {}", record.path.display(), digest);
            record.attach_digest(DigestState::Computed(digest));
            if let Some(ref callback) = config.progress_callback {
                callback.on_item_completed(record.size);
            }
            HashOutcome::Hashed(record.size)
        }
        // Partial state is discarded: the record stays pending.
        Err(HashError::Interrupted(_)) => HashOutcome::Interrupted,
        Err(e) => {
            log::warn!("Failed to hash {}: {}", record.path.display(), e);
            record.attach_digest(DigestState::Failed);
            HashOutcome::Failed(e)
        }
    }
}

/// Hash every pending record of `files` in place.
///
/// Work is spread over a dedicated rayon pool with at most
/// `config.io_threads` workers; each worker owns a disjoint record. A file
/// that cannot be read is marked [`DigestState::Failed`] and reported in
/// [`HashStats::errors`]; the batch always runs to completion unless
/// shutdown is requested.
pub fn hash_all(files: &mut FileCollection, hasher: &Hasher, config: &HashConfig) -> HashStats {
    let input_files = files.iter().filter(|r| r.is_pending()).count();
    let mut stats = HashStats {
        input_files,
        ..Default::default()
    };

    if input_files == 0 {
        log::debug!("Hashing: No files to process");
        return stats;
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_start("hashing", input_files);
    }

    log::info!(
        "Hashing {} files with {} ({} workers)",
        input_files,
        hasher.algorithm(),
        config.io_threads.max(1)
    );

    let completed = AtomicUsize::new(0);
    let run = |records: &mut [FileRecord]| -> Vec<HashOutcome> {
        records
            .par_iter_mut()
            .filter(|r| r.is_pending())
            .map(|record| hash_record(record, hasher, config, &completed))
            .collect()
    };

    let outcomes = match rayon::ThreadPoolBuilder::new()
        .num_threads(config.io_threads.max(1))
        .build()
    {
        Ok(pool) => pool.install(|| run(files.records_mut())),
        Err(e) => {
            log::warn!(
                "Failed to create hashing thread pool ({}), using global pool with {} threads",
                e,
                rayon::current_num_threads()
            );
            run(files.records_mut())
        }
    };

    for outcome in outcomes {
        match outcome {
            HashOutcome::Hashed(size) => {
                stats.hashed_files += 1;
                stats.bytes_hashed += size;
            }
            HashOutcome::Failed(e) => {
                stats.failed_files += 1;
                stats.errors.push(e);
            }
            HashOutcome::Interrupted => stats.interrupted = true,
        }
    }

    if stats.interrupted {
        log::info!("Hashing: Interrupted by shutdown signal");
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_end("hashing");
    }

    log::info!(
        "Hashing complete: {} hashed, {} failed, {} bytes",
        stats.hashed_files,
        stats.failed_files,
        stats.bytes_hashed
    );

    stats
}
