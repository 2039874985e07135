#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Text format for generated levels and trained behaviour maps.
//!
//! A grid is stored one row per line with whitespace between cells. Rows are
//! joined by `\n` without a trailing newline. Direction-set cells list their
//! direction indices joined by `_`, with `-1` for an empty set. With
//! `invert_x` the first line holds the highest grid row instead of row zero;
//! reading and writing must agree on the flag.

use std::{
    fmt::Display,
    fs, io,
    path::{Path, PathBuf},
};

use maze_rooms_core::{CellGrid, CellState, DirectionSet, GridError};
use tracing::debug;

/// Failures raised while reading or writing grid text.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The requested file does not exist.
    #[error("{} does not exist", path.display())]
    NotFound {
        /// Path that was requested.
        path: PathBuf,
    },
    /// The file could not be read or written.
    #[error("failed to access {}", path.display())]
    Io {
        /// Path that was accessed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A cell token could not be interpreted.
    #[error("line {line}, column {column}: cannot parse '{token}'")]
    Parse {
        /// One-based line number of the token.
        line: usize,
        /// One-based cell index within the line.
        column: usize,
        /// Offending token.
        token: String,
    },
    /// A row held a different number of cells than the first row.
    #[error("line {line} holds {found} cells, expected {expected}")]
    Ragged {
        /// One-based line number of the row.
        line: usize,
        /// Cell count of the first row.
        expected: usize,
        /// Cell count of the offending row.
        found: usize,
    },
    /// The parsed rows did not form a valid grid.
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Parses a grid of direction sets.
pub fn parse_direction_grid(
    text: &str,
    invert_x: bool,
) -> Result<Vec<Vec<DirectionSet>>, CodecError> {
    parse_grid(text, invert_x, |token| token.parse::<DirectionSet>().ok())
}

/// Formats a grid of direction sets.
#[must_use]
pub fn format_direction_grid(grid: &[Vec<DirectionSet>], invert_x: bool) -> String {
    format_grid(grid, invert_x)
}

/// Parses a grid of plain integers.
pub fn parse_int_grid(text: &str, invert_x: bool) -> Result<Vec<Vec<i32>>, CodecError> {
    parse_grid(text, invert_x, |token| token.parse::<i32>().ok())
}

/// Formats a grid of plain integers.
#[must_use]
pub fn format_int_grid(grid: &[Vec<i32>], invert_x: bool) -> String {
    format_grid(grid, invert_x)
}

/// Parses a square level grid stored as cell state codes.
pub fn parse_cell_grid(text: &str, invert_x: bool) -> Result<CellGrid, CodecError> {
    let rows = parse_grid(text, invert_x, |token| {
        token.parse::<i32>().ok().and_then(CellState::from_code)
    })?;
    Ok(CellGrid::from_rows(rows)?)
}

/// Formats a level grid as cell state codes.
#[must_use]
pub fn format_cell_grid(grid: &CellGrid, invert_x: bool) -> String {
    let rows: Vec<Vec<i32>> = grid
        .rows()
        .map(|row| row.iter().map(|cell| cell.code()).collect())
        .collect();
    format_grid(&rows, invert_x)
}

/// Reads a direction-set grid from disk.
pub fn read_direction_grid_file(
    path: &Path,
    invert_x: bool,
) -> Result<Vec<Vec<DirectionSet>>, CodecError> {
    parse_direction_grid(&read_text(path)?, invert_x)
}

/// Writes a direction-set grid to disk.
pub fn write_direction_grid_file(
    path: &Path,
    grid: &[Vec<DirectionSet>],
    invert_x: bool,
) -> Result<(), CodecError> {
    write_text(path, &format_direction_grid(grid, invert_x))
}

/// Reads an integer grid from disk.
pub fn read_int_grid_file(path: &Path, invert_x: bool) -> Result<Vec<Vec<i32>>, CodecError> {
    parse_int_grid(&read_text(path)?, invert_x)
}

/// Writes an integer grid to disk.
pub fn write_int_grid_file(path: &Path, grid: &[Vec<i32>], invert_x: bool) -> Result<(), CodecError> {
    write_text(path, &format_int_grid(grid, invert_x))
}

/// Reads a level grid from disk.
pub fn read_cell_grid_file(path: &Path, invert_x: bool) -> Result<CellGrid, CodecError> {
    parse_cell_grid(&read_text(path)?, invert_x)
}

/// Writes a level grid to disk.
pub fn write_cell_grid_file(path: &Path, grid: &CellGrid, invert_x: bool) -> Result<(), CodecError> {
    write_text(path, &format_cell_grid(grid, invert_x))
}

fn parse_grid<T, F>(text: &str, invert_x: bool, parse_token: F) -> Result<Vec<Vec<T>>, CodecError>
where
    F: Fn(&str) -> Option<T>,
{
    let mut rows = Vec::new();
    let mut expected = None;
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_number = index + 1;
        let row = line
            .split_whitespace()
            .enumerate()
            .map(|(column, token)| {
                parse_token(token).ok_or_else(|| CodecError::Parse {
                    line: line_number,
                    column: column + 1,
                    token: token.to_owned(),
                })
            })
            .collect::<Result<Vec<T>, CodecError>>()?;

        let expected = *expected.get_or_insert(row.len());
        if row.len() != expected {
            return Err(CodecError::Ragged {
                line: line_number,
                expected,
                found: row.len(),
            });
        }
        rows.push(row);
    }
    if invert_x {
        rows.reverse();
    }
    Ok(rows)
}

fn format_grid<T: Display>(grid: &[Vec<T>], invert_x: bool) -> String {
    let format_row = |row: &Vec<T>| {
        row.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    };
    let lines: Vec<String> = if invert_x {
        grid.iter().rev().map(format_row).collect()
    } else {
        grid.iter().map(format_row).collect()
    };
    lines.join("\n")
}

fn read_text(path: &Path) -> Result<String, CodecError> {
    let text = fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => CodecError::NotFound {
            path: path.to_path_buf(),
        },
        _ => CodecError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    debug!(path = %path.display(), bytes = text.len(), "read grid text");
    Ok(text)
}

fn write_text(path: &Path, text: &str) -> Result<(), CodecError> {
    fs::write(path, text).map_err(|source| CodecError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = text.len(), "wrote grid text");
    Ok(())
}

#[cfg(test)]
mod tests {
    use maze_rooms_core::Direction;

    use super::*;

    #[test]
    fn rows_are_space_delimited_without_trailing_newline() {
        let grid = vec![
            vec![DirectionSet::EMPTY, DirectionSet::ALL],
            vec![
                [Direction::East].into_iter().collect(),
                [Direction::North, Direction::West].into_iter().collect(),
            ],
        ];
        assert_eq!(format_direction_grid(&grid, false), "-1 0_1_2_3\n1 0_3");
        assert_eq!(format_direction_grid(&grid, true), "1 0_3\n-1 0_1_2_3");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let parsed = parse_int_grid("1 2\n\n3 4\n", false).expect("valid grid");
        assert_eq!(parsed, vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn bad_tokens_report_their_location() {
        let error = parse_direction_grid("0 1\n2 7", false).expect_err("7 is not a direction");
        assert!(matches!(
            error,
            CodecError::Parse { line: 2, column: 2, ref token } if token == "7"
        ));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let error = parse_int_grid("1 2 3\n4 5", false).expect_err("second row is short");
        assert!(matches!(
            error,
            CodecError::Ragged {
                line: 2,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn unknown_cell_codes_fail() {
        assert!(matches!(
            parse_cell_grid("0 1\n2 5", false),
            Err(CodecError::Parse { .. })
        ));
        assert!(matches!(
            parse_cell_grid("0 1 0\n2 1 0", false),
            Err(CodecError::Grid(GridError::InvalidArgument(_)))
        ));
    }
}
