//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Running the walk → hash pipeline ([`finder`])
//! - Digest-keyed grouping and wasted space accounting ([`groups`])
//! - Optional byte-by-byte verification of groups

pub mod finder;
pub mod groups;

pub use finder::{DuplicateFinder, FinderConfig, FinderError, ScanReport, ScanSummary};
pub use groups::{Collision, DuplicateGroup, DuplicateIndex, VerifyStats, WastedSpace};
