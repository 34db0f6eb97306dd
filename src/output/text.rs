//! Plain text report.
//!
//! ```text
//! aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d
//! 	./a.txt
//! 	./b.txt
//!
//! 10 bytes wasted space
//! ```
//!
//! Each group prints its hex digest, then every member path on a
//! tab-indented line, then a blank line. The wasted space line is omitted
//! when nothing is wasted, so a tree without duplicates prints nothing.
//! In verbose mode the wasted space line also carries a human-readable size.

use std::io::{self, Write};

use crate::duplicates::{DuplicateIndex, ScanSummary};

/// Text report over a built index.
pub struct TextOutput<'i, 'a> {
    index: &'i DuplicateIndex<'a>,
    summary: &'i ScanSummary,
    human_sizes: bool,
}

impl<'i, 'a> TextOutput<'i, 'a> {
    /// Create a report for `index` with the wasted bytes from `summary`.
    #[must_use]
    pub fn new(index: &'i DuplicateIndex<'a>, summary: &'i ScanSummary) -> Self {
        Self {
            index,
            summary,
            human_sizes: false,
        }
    }

    /// Append a human-readable size to the wasted space line.
    #[must_use]
    pub fn with_human_sizes(mut self, enabled: bool) -> Self {
        self.human_sizes = enabled;
        self
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for group in self.index.sorted_groups() {
            writeln!(writer, "{}", group.digest)?;
            for file in &group.files {
                writeln!(writer, "\t{}", file.path.display())?;
            }
            writeln!(writer)?;
        }

        if self.summary.wasted_bytes > 0 {
            write!(writer, "{} bytes wasted space", self.summary.wasted_bytes)?;
            if self.human_sizes {
                write!(writer, " ({})", self.summary.wasted_display())?;
            }
            writeln!(writer)?;
        }
        writer.flush()
    }

    /// Render the report into a string.
    #[must_use]
    pub fn to_string_lossy(&self) -> String {
        let mut buffer = Vec::new();
        // Writing to a Vec cannot fail.
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
