//! Digest-keyed duplicate index.
//!
//! # Overview
//!
//! [`DuplicateIndex`] groups the hashed records of a [`FileCollection`] by
//! digest. Buckets store positions into the collection, never copies of the
//! records, so the collection stays the single owner of every file.
//!
//! Buckets with one member are unique files. Buckets with two or more
//! members are duplicate groups.
//!
//! # Example
//!
//! ```
//! use dupfind::duplicates::{DuplicateIndex, WastedSpace};
//! use dupfind::scanner::{Digest, DigestState, FileCollection, FileRecord};
//! use std::path::PathBuf;
//!
//! let mut files = FileCollection::new();
//! for (name, digest) in [("a.txt", 1u8), ("b.txt", 1), ("c.txt", 2)] {
//!     let mut record = FileRecord::new(PathBuf::from(name), 5);
//!     record.attach_digest(DigestState::Computed(Digest::from_bytes(&[digest])));
//!     files.push(record);
//! }
//!
//! let index = DuplicateIndex::build(&files);
//! assert_eq!(index.group_count(), 1);
//! assert_eq!(index.wasted_bytes(WastedSpace::AllCopies), 10);
//! assert_eq!(index.wasted_bytes(WastedSpace::Reclaimable), 5);
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::progress::ProgressCallback;
use crate::scanner::{files_identical, Digest, FileCollection, FileRecord, HashError, Hasher};

/// Definition of "wasted" bytes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum WastedSpace {
    /// Total size of every member of every duplicate group.
    #[default]
    #[value(name = "all")]
    #[serde(rename = "all")]
    AllCopies,
    /// Bytes freed by keeping one copy per group: `size × (count − 1)`.
    Reclaimable,
}

impl std::fmt::Display for WastedSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllCopies => write!(f, "all"),
            Self::Reclaimable => write!(f, "reclaimable"),
        }
    }
}

/// A confirmed duplicate group borrowed from the collection.
#[derive(Debug, Clone)]
pub struct DuplicateGroup<'a> {
    /// Digest shared by every member
    pub digest: &'a Digest,
    /// Members in collection order
    pub files: Vec<&'a FileRecord>,
}

impl DuplicateGroup<'_> {
    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Size of the first member.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.files.first().map_or(0, |f| f.size)
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Space freed by keeping only the first member.
    #[must_use]
    pub fn reclaimable_space(&self) -> u64 {
        self.total_size().saturating_sub(self.size())
    }

    /// Wasted bytes of this group under `mode`.
    #[must_use]
    pub fn wasted_space(&self, mode: WastedSpace) -> u64 {
        if self.files.len() < 2 {
            return 0;
        }
        match mode {
            WastedSpace::AllCopies => self.total_size(),
            WastedSpace::Reclaimable => self.reclaimable_space(),
        }
    }

    /// Number of duplicate copies (total - 1 original).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Paths of the members.
    #[must_use]
    pub fn paths(&self) -> Vec<&Path> {
        self.files.iter().map(|f| f.path.as_path()).collect()
    }
}

/// A record whose bytes differ from its group despite a matching digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    /// The colliding digest
    pub digest: Digest,
    /// The group member the file was compared against
    pub reference: PathBuf,
    /// The file removed from the group
    pub path: PathBuf,
}

/// Statistics from the verification pass.
#[derive(Debug, Default)]
pub struct VerifyStats {
    /// Members compared byte-by-byte against their group's first member
    pub compared_files: usize,
    /// Members removed because their bytes differ
    pub collisions: Vec<Collision>,
    /// Members removed because they could not be read
    pub errors: Vec<HashError>,
}

/// Mapping from digest to positions in a [`FileCollection`].
#[derive(Debug)]
pub struct DuplicateIndex<'a> {
    files: &'a FileCollection,
    buckets: HashMap<&'a Digest, Vec<usize>>,
}

impl<'a> DuplicateIndex<'a> {
    /// Index every record of `files` that has a computed digest.
    ///
    /// Pending and failed records are left out. Members of a bucket keep
    /// collection order.
    #[must_use]
    pub fn build(files: &'a FileCollection) -> Self {
        let mut buckets: HashMap<&'a Digest, Vec<usize>> = HashMap::new();
        for (position, record) in files.iter().enumerate() {
            if let Some(digest) = record.digest() {
                buckets.entry(digest).or_default().push(position);
            }
        }

        log::debug!(
            "Indexed {} digests from {} records",
            buckets.len(),
            files.len()
        );

        Self { files, buckets }
    }

    /// The indexed collection.
    #[must_use]
    pub fn collection(&self) -> &'a FileCollection {
        self.files
    }

    fn members(&self, positions: &[usize]) -> Vec<&'a FileRecord> {
        let files = self.files;
        positions
            .iter()
            .filter_map(|&position| files.get(position))
            .collect()
    }

    /// Groups with at least two members, in map iteration order.
    ///
    /// The order is not stable between runs; use [`Self::sorted_groups`]
    /// for reports.
    #[must_use]
    pub fn duplicate_groups(&self) -> Vec<DuplicateGroup<'a>> {
        self.buckets
            .iter()
            .filter(|(_, positions)| positions.len() > 1)
            .map(|(digest, positions)| DuplicateGroup {
                digest: *digest,
                files: self.members(positions),
            })
            .collect()
    }

    /// Duplicate groups ordered by descending total size, then digest.
    #[must_use]
    pub fn sorted_groups(&self) -> Vec<DuplicateGroup<'a>> {
        let mut groups = self.duplicate_groups();
        groups.sort_by(|a, b| {
            b.total_size()
                .cmp(&a.total_size())
                .then_with(|| a.digest.cmp(b.digest))
        });
        groups
    }

    /// Members of the bucket for `digest`, including single-member buckets.
    #[must_use]
    pub fn files_for(&self, digest: &Digest) -> Vec<&'a FileRecord> {
        self.buckets
            .get(digest)
            .map(|positions| self.members(positions))
            .unwrap_or_default()
    }

    /// Total wasted bytes under `mode`.
    ///
    /// With [`WastedSpace::AllCopies`] this is the sum of the sizes of every
    /// record in a group of two or more. With [`WastedSpace::Reclaimable`]
    /// the first member of each group is not counted.
    #[must_use]
    pub fn wasted_bytes(&self, mode: WastedSpace) -> u64 {
        self.duplicate_groups()
            .iter()
            .map(|group| group.wasted_space(mode))
            .sum()
    }

    /// Number of distinct digests.
    #[must_use]
    pub fn digest_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of duplicate groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.buckets.values().filter(|p| p.len() > 1).count()
    }

    /// Number of files with no duplicate.
    #[must_use]
    pub fn unique_count(&self) -> usize {
        self.buckets.values().filter(|p| p.len() == 1).count()
    }

    /// Number of duplicate copies across all groups (excluding one original each).
    #[must_use]
    pub fn duplicate_file_count(&self) -> usize {
        self.buckets
            .values()
            .filter(|p| p.len() > 1)
            .map(|p| p.len() - 1)
            .sum()
    }

    /// Number of records that made it into the index.
    #[must_use]
    pub fn hashed_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Byte-compare every group member against the group's first member.
    ///
    /// Members whose content differs are removed from their bucket and
    /// reported as [`Collision`]s; unreadable members are removed and
    /// reported as errors, once each. When the first member itself cannot be
    /// read, the next readable member takes its place as the reference.
    /// Every remaining bucket holds byte-identical files and no digest key
    /// is duplicated.
    pub fn verify(
        &mut self,
        hasher: &Hasher,
        progress: Option<&Arc<dyn ProgressCallback>>,
    ) -> VerifyStats {
        let mut stats = VerifyStats::default();
        let files = self.files;
        let total: usize = self
            .buckets
            .values()
            .filter(|p| p.len() > 1)
            .map(|p| p.len() - 1)
            .sum();

        if let Some(callback) = progress {
            callback.on_phase_start("verifying", total);
        }

        for (digest, positions) in self.buckets.iter_mut() {
            if positions.len() < 2 {
                continue;
            }

            let mut reference = positions[0];
            let mut matched: Vec<usize> = Vec::with_capacity(positions.len() - 1);
            for &position in &positions[1..] {
                let Some(candidate) = files.get(position) else {
                    continue;
                };
                stats.compared_files += 1;
                if let Some(callback) = progress {
                    callback.on_progress(stats.compared_files, &candidate.path.to_string_lossy());
                }

                loop {
                    let Some(current) = files.get(reference) else {
                        break;
                    };
                    match files_identical(&current.path, &candidate.path, hasher.buffer_size()) {
                        Ok(true) => matched.push(position),
                        Ok(false) => {
                            log::warn!(
                                "Digest collision: {} differs from {} (digest {})",
                                candidate.path.display(),
                                current.path.display(),
                                digest
                            );
                            stats.collisions.push(Collision {
                                digest: (*digest).clone(),
                                reference: current.path.clone(),
                                path: candidate.path.clone(),
                            });
                        }
                        Err(e) if e.path() == current.path => {
                            // The reference is gone: promote the earliest
                            // confirmed member, or the candidate itself.
                            log::warn!("Verification failed: {}", e);
                            stats.errors.push(e);
                            if matched.is_empty() {
                                reference = position;
                            } else {
                                reference = matched.remove(0);
                                continue;
                            }
                        }
                        Err(e) => {
                            log::warn!("Verification failed: {}", e);
                            stats.errors.push(e);
                        }
                    }
                    break;
                }
            }

            *positions = std::iter::once(reference).chain(matched).collect();
        }

        if let Some(callback) = progress {
            callback.on_phase_end("verifying");
        }

        log::info!(
            "Verification complete: {} compared, {} collisions, {} errors",
            stats.compared_files,
            stats.collisions.len(),
            stats.errors.len()
        );

        stats
    }
}
