//! Open-boundary descriptor file.
//!
//! # File Format
//!
//! ```text
//! 0
//! 1
//! 40 1 59 4 0
//! 1
//! 60 1 40 4 0
//! 2
//! 1 1 20 4 0
//! 1 25 59 4 0
//! ```
//!
//! One block per side in the order west, north, east, south. Each block is
//! the segment count followed by one line per segment:
//! `<position> <start> <end> <type-code> <spare>`, all indices 1-based.
//! The position is the row (north/south) or column (east/west) the side
//! lies on.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use thiserror::Error;

use crate::boundary::{OpenBoundaries, OpenBoundarySegment};
use crate::types::Side;

/// Error type for descriptor files.
#[derive(Debug, Error)]
pub enum BdyInfoError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Parse error with line number
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// File ended inside a block
    #[error("descriptor ends inside the {side} block")]
    Truncated { side: Side },

    /// Lines left after the south block
    #[error("unexpected content after the south block at line {line}")]
    TrailingContent { line: usize },

    /// Segment lies outside the grid
    #[error("{side} segment {start}..={end} at position {position} lies outside grid {shape:?}")]
    OutOfGrid {
        side: Side,
        position: usize,
        start: usize,
        end: usize,
        shape: (usize, usize),
    },
}

/// Render the descriptor.
pub fn format_bdyinfo(boundaries: &OpenBoundaries) -> String {
    let mut out = String::new();
    for side in Side::ALL {
        let segments: Vec<&OpenBoundarySegment> = boundaries.for_side(side).collect();
        out.push_str(&format!("{}\n", segments.len()));
        for s in segments {
            out.push_str(&format!(
                "{} {} {} {} {}\n",
                s.position + 1,
                s.start + 1,
                s.end + 1,
                s.type_code,
                s.spare
            ));
        }
    }
    out
}

/// Write the descriptor file.
pub fn write_bdyinfo_file(path: &Path, boundaries: &OpenBoundaries) -> Result<(), BdyInfoError> {
    let mut file = File::create(path)?;
    file.write_all(format_bdyinfo(boundaries).as_bytes())?;
    Ok(())
}

/// Parse a descriptor for a grid of the given shape.
pub fn parse_bdyinfo(content: &str, shape: (usize, usize)) -> Result<OpenBoundaries, BdyInfoError> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());
    let mut segments = Vec::new();

    for side in Side::ALL {
        let (line, count) = lines.next().ok_or(BdyInfoError::Truncated { side })?;
        let count: usize = count.parse().map_err(|_| BdyInfoError::ParseError {
            line,
            message: format!("Invalid {side} segment count"),
        })?;
        for _ in 0..count {
            let (line, text) = lines.next().ok_or(BdyInfoError::Truncated { side })?;
            let fields: Vec<i64> = text
                .split_whitespace()
                .map(str::parse)
                .collect::<Result<_, _>>()
                .map_err(|_| BdyInfoError::ParseError {
                    line,
                    message: "Expected integers".into(),
                })?;
            if fields.len() != 5 || fields[..3].iter().any(|&v| v < 1) {
                return Err(BdyInfoError::ParseError {
                    line,
                    message: "Expected: position start end type spare (1-based)".into(),
                });
            }
            let segment = OpenBoundarySegment {
                side,
                position: fields[0] as usize - 1,
                start: fields[1] as usize - 1,
                end: fields[2] as usize - 1,
                type_code: fields[3] as i32,
                spare: fields[4] as i32,
            };
            check_in_grid(&segment, shape)?;
            segments.push(segment);
        }
    }
    if let Some((line, _)) = lines.next() {
        return Err(BdyInfoError::TrailingContent { line });
    }
    Ok(OpenBoundaries { shape, segments })
}

/// Read a descriptor file.
pub fn read_bdyinfo_file(path: &Path, shape: (usize, usize)) -> Result<OpenBoundaries, BdyInfoError> {
    let content = std::fs::read_to_string(path)?;
    parse_bdyinfo(&content, shape)
}

fn check_in_grid(s: &OpenBoundarySegment, shape: (usize, usize)) -> Result<(), BdyInfoError> {
    let (n_rows, n_cols) = shape;
    let (line_len, along_len) = if s.side.is_row() { (n_rows, n_cols) } else { (n_cols, n_rows) };
    if s.position >= line_len || s.end >= along_len || s.start > s.end {
        return Err(BdyInfoError::OutOfGrid {
            side: s.side,
            position: s.position,
            start: s.start,
            end: s.end,
            shape,
        });
    }
    Ok(())
}
