//! Grounding-line index file (discharge injection points).
//!
//! # File Format
//!
//! ```text
//! 3
//! 12 1 79NG
//! 11 2 79NG
//! 11 3 79NG
//! ```
//!
//! First line is the point count; each following line holds the 1-based
//! column (longitude index), the 1-based row (latitude index) and a tag.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use thiserror::Error;

use crate::boundary::GroundingLine;
use crate::types::GridPoint;

/// Error type for grounding-line files.
#[derive(Debug, Error)]
pub enum DischargeFileError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Parse error with line number
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Declared count differs from the number of point lines
    #[error("file declares {declared} points but contains {found}")]
    CountMismatch { declared: usize, found: usize },
}

/// Render the grounding line in file format.
pub fn format_grounding_line(line: &GroundingLine) -> String {
    let mut out = format!("{}\n", line.points.len());
    for p in &line.points {
        let (i, j) = p.one_based();
        out.push_str(&format!("{} {} {}\n", i, j, line.tag));
    }
    out
}

/// Write the grounding-line index file.
pub fn write_grounding_line_file(path: &Path, line: &GroundingLine) -> Result<(), DischargeFileError> {
    let mut file = File::create(path)?;
    file.write_all(format_grounding_line(line).as_bytes())?;
    Ok(())
}

/// Read a grounding-line index file back into 0-based points and their tags.
pub fn read_grounding_line_file(path: &Path) -> Result<Vec<(GridPoint, String)>, DischargeFileError> {
    let reader = BufReader::new(File::open(path)?);
    let mut declared: Option<usize> = None;
    let mut points = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parse_err = |message: &str| DischargeFileError::ParseError {
            line: line_num + 1,
            message: message.into(),
        };

        if declared.is_none() {
            declared = Some(line.parse().map_err(|_| parse_err("Invalid point count"))?);
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            return Err(parse_err("Expected: i j tag"));
        }
        let i: usize = parts[0].parse().map_err(|_| parse_err("Invalid i index"))?;
        let j: usize = parts[1].parse().map_err(|_| parse_err("Invalid j index"))?;
        if i == 0 || j == 0 {
            return Err(parse_err("Indices are 1-based"));
        }
        points.push((GridPoint::new(j - 1, i - 1), parts[2..].join(" ")));
    }

    let declared = declared.unwrap_or(0);
    if declared != points.len() {
        return Err(DischargeFileError::CountMismatch {
            declared,
            found: points.len(),
        });
    }
    Ok(points)
}
