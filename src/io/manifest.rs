//! Manifests of multi-file monthly series.
//!
//! A series split over several files is listed explicitly, each file with
//! the months it must contain. Entries must be sorted and contiguous, so a
//! missing or duplicated file is caught before anything is read.
//!
//! # File Format
//!
//! ```text
//! # file first-month last-month
//! salt_2014.nc 2014-01 2014-12
//! salt_2015.nc 2015-01 2015-12
//! ```
//!
//! Paths are relative to the manifest's directory.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::YearMonth;

/// Error type for series manifests.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Parse error with line number
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Manifest lists no file
    #[error("manifest lists no file")]
    EmptyManifest,

    /// An entry ends before it starts
    #[error("entry {index} ({file}): last month {last} precedes first month {first}")]
    InvertedRange {
        index: usize,
        file: String,
        first: YearMonth,
        last: YearMonth,
    },

    /// Consecutive entries leave a gap or overlap
    #[error("entry {index} ({file}) starts at {found}, expected {expected}")]
    NotContiguous {
        index: usize,
        file: String,
        expected: YearMonth,
        found: YearMonth,
    },

    /// A file holds other months than declared
    #[error("{file}: declared {first}..={last} ({declared} months), file holds {found}")]
    RecordMismatch {
        file: String,
        first: YearMonth,
        last: YearMonth,
        declared: usize,
        found: usize,
    },
}

/// One file of a series and the months it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path to the file
    pub file: PathBuf,
    /// First month in the file
    pub first: YearMonth,
    /// Last month in the file
    pub last: YearMonth,
}

impl ManifestEntry {
    /// Create an entry.
    pub fn new(file: impl Into<PathBuf>, first: YearMonth, last: YearMonth) -> Self {
        Self {
            file: file.into(),
            first,
            last,
        }
    }

    /// Months of the entry, in order.
    pub fn months(&self) -> Vec<YearMonth> {
        YearMonth::range_inclusive(self.first, self.last)
    }

    /// Check a file's actual months against the declaration.
    pub fn check_records(&self, found: &[YearMonth]) -> Result<(), ManifestError> {
        let declared = self.months();
        if declared != found {
            return Err(ManifestError::RecordMismatch {
                file: self.file.display().to_string(),
                first: self.first,
                last: self.last,
                declared: declared.len(),
                found: found.len(),
            });
        }
        Ok(())
    }
}

/// Validated, sorted list of series files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ManifestEntry>", into = "Vec<ManifestEntry>")]
pub struct TimeSeriesManifest {
    entries: Vec<ManifestEntry>,
}

impl TimeSeriesManifest {
    /// Validate entries.
    ///
    /// # Errors
    /// - `EmptyManifest` if no entry is given
    /// - `InvertedRange` if an entry ends before it starts
    /// - `NotContiguous` if an entry does not start the month after its predecessor
    pub fn new(entries: Vec<ManifestEntry>) -> Result<Self, ManifestError> {
        if entries.is_empty() {
            return Err(ManifestError::EmptyManifest);
        }
        for (index, entry) in entries.iter().enumerate() {
            if entry.last < entry.first {
                return Err(ManifestError::InvertedRange {
                    index,
                    file: entry.file.display().to_string(),
                    first: entry.first,
                    last: entry.last,
                });
            }
            if index > 0 {
                let expected = entries[index - 1].last.succ();
                if entry.first != expected {
                    return Err(ManifestError::NotContiguous {
                        index,
                        file: entry.file.display().to_string(),
                        expected,
                        found: entry.first,
                    });
                }
            }
        }
        Ok(Self { entries })
    }

    /// Entries in time order.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// First and last month covered.
    pub fn time_range(&self) -> (YearMonth, YearMonth) {
        // new() rejects empty manifests
        let first = self.entries[0].first;
        let last = self.entries[self.entries.len() - 1].last;
        (first, last)
    }

    /// All months covered, in order.
    pub fn months(&self) -> Vec<YearMonth> {
        let (first, last) = self.time_range();
        YearMonth::range_inclusive(first, last)
    }

    /// Resolve relative file paths against `base`.
    pub fn resolved(&self, base: &Path) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|e| ManifestEntry {
                file: if e.file.is_absolute() {
                    e.file.clone()
                } else {
                    base.join(&e.file)
                },
                ..e.clone()
            })
            .collect();
        Self { entries }
    }
}

impl TryFrom<Vec<ManifestEntry>> for TimeSeriesManifest {
    type Error = ManifestError;

    fn try_from(entries: Vec<ManifestEntry>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<TimeSeriesManifest> for Vec<ManifestEntry> {
    fn from(manifest: TimeSeriesManifest) -> Self {
        manifest.entries
    }
}

/// Parse manifest text.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_manifest(content: &str) -> Result<TimeSeriesManifest, ManifestError> {
    let mut entries = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line_num = i + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(ManifestError::ParseError {
                line: line_num,
                message: format!("Expected 3 columns (file first last), got {}", parts.len()),
            });
        }
        let month = |s: &str| {
            s.parse::<YearMonth>()
                .map_err(|message| ManifestError::ParseError { line: line_num, message })
        };
        entries.push(ManifestEntry::new(parts[0], month(parts[1])?, month(parts[2])?));
    }
    TimeSeriesManifest::new(entries)
}

/// Read a manifest file, resolving paths against its directory.
pub fn read_manifest_file(path: &Path) -> Result<TimeSeriesManifest, ManifestError> {
    let reader = BufReader::new(File::open(path)?);
    let mut content = String::new();
    for line in reader.lines() {
        content.push_str(&line?);
        content.push('\n');
    }
    let manifest = parse_manifest(&content)?;
    Ok(match path.parent() {
        Some(dir) => manifest.resolved(dir),
        None => manifest,
    })
}
