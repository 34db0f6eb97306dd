//! Output formatters for duplicate scan results.
//!
//! - [`text`]: the plain report, one block per group followed by the wasted
//!   space line
//! - [`json`]: machine-readable output for scripting
//!
//! Both write groups in [`DuplicateIndex::sorted_groups`] order and paths as
//! they were discovered under the scanned root.
//!
//! # Example
//!
//! ```no_run
//! use dupfind::duplicates::DuplicateFinder;
//! use dupfind::output::json::JsonOutput;
//! use std::path::Path;
//!
//! let report = DuplicateFinder::with_defaults()
//!     .find_duplicates(Path::new("."))
//!     .unwrap();
//! let (index, verify_stats) = report.index();
//! let summary = report.summary(&index, verify_stats.as_ref());
//!
//! let output = JsonOutput::new(&index, &summary);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```
//!
//! [`DuplicateIndex::sorted_groups`]: crate::duplicates::DuplicateIndex::sorted_groups

pub mod json;
pub mod text;

use serde::{Deserialize, Serialize};

pub use json::{JsonOutput, JsonOutputError};
pub use text::TextOutput;

/// Report format written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text report
    #[default]
    Text,
    /// JSON document
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
