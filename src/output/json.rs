//! JSON output formatter for duplicate scan results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "hash": "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d",
//!       "size": 5,
//!       "files": ["./a.txt", "./b.txt"]
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 3,
//!     "total_size": 15,
//!     "hashed_files": 3,
//!     "failed_files": 0,
//!     "bytes_hashed": 15,
//!     "duplicate_groups": 1,
//!     "duplicate_files": 1,
//!     "wasted_bytes": 10,
//!     "wasted_space": "all",
//!     "algorithm": "sha1",
//!     "collisions": 0,
//!     "warnings": 0,
//!     "scan_duration_ms": 3
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::duplicates::{DuplicateGroup, DuplicateIndex, ScanSummary, WastedSpace};
use crate::scanner::HashAlgorithm;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Digest as lowercase hexadecimal
    pub hash: String,
    /// Size of each member in bytes
    pub size: u64,
    /// Member paths as discovered
    pub files: Vec<String>,
}

impl JsonDuplicateGroup {
    /// Create a JSON duplicate group from a [`DuplicateGroup`].
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup<'_>) -> Self {
        Self {
            hash: group.digest.to_hex(),
            size: group.size(),
            files: group
                .files
                .iter()
                .map(|f| f.path.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
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
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Duplicate copies, excluding one original per group
    pub duplicate_files: usize,
    /// Wasted bytes under `wasted_space`
    pub wasted_bytes: u64,
    /// Wasted space definition
    pub wasted_space: WastedSpace,
    /// Digest algorithm
    pub algorithm: HashAlgorithm,
    /// Members removed by verification
    pub collisions: usize,
    /// Per-entry warnings
    pub warnings: usize,
    /// Walk and hash duration in milliseconds
    pub scan_duration_ms: u64,
}

impl From<&ScanSummary> for JsonSummary {
    fn from(summary: &ScanSummary) -> Self {
        Self {
            total_files: summary.total_files,
            total_size: summary.total_size,
            hashed_files: summary.hashed_files,
            failed_files: summary.failed_files,
            bytes_hashed: summary.bytes_hashed,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            wasted_bytes: summary.wasted_bytes,
            wasted_space: summary.wasted_space,
            algorithm: summary.algorithm,
            collisions: summary.collisions,
            warnings: summary.warnings,
            scan_duration_ms: u64::try_from(summary.scan_duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Duplicate groups, largest first
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output from an index and its summary.
    #[must_use]
    pub fn new(index: &DuplicateIndex<'_>, summary: &ScanSummary) -> Self {
        Self::from_groups(&index.sorted_groups(), summary)
    }

    /// Create a new JSON output from already collected groups.
    #[must_use]
    pub fn from_groups(groups: &[DuplicateGroup<'_>], summary: &ScanSummary) -> Self {
        Self {
            duplicates: groups
                .iter()
                .map(JsonDuplicateGroup::from_duplicate_group)
                .collect(),
            summary: JsonSummary::from(summary),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON output: {0}")]
    Io(#[from] std::io::Error),
}
