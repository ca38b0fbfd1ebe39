//! Range resolution: user-supplied `A:E` / `A1:E10` / `A10:E` / `A:E10`
//! strings into sheet-bounded column and row extents.
//!
//! Ranges larger than the live sheet are never an error. Sheets grow and
//! shrink between the time a job is configured and the time it runs, so an
//! overflowing bound is narrowed to the sheet and recorded in [`Capping`]
//! for the caller to report.

use std::fmt;

use serde::Serialize;

use crate::notation::{column_to_letters, parse_cell_ref, CellRef};

/// Errors raised while parsing or validating a range. None of them is
/// retriable; all are raised before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("invalid cell reference \"{token}\"")]
    InvalidCellReference { token: String },

    #[error(
        "Invalid column range \"{range}\" for sheet \"{sheet}\". \
         Expected format: \"A:E\", \"A1:E10\", \"A10:E\" or \"A:E10\""
    )]
    InvalidRangeFormat { range: String, sheet: String },

    #[error(
        "Invalid column range \"{range}\" for sheet \"{sheet}\": \
         \"{token}\" is not a cell reference"
    )]
    InvalidRangeCell {
        range: String,
        sheet: String,
        token: String,
    },

    #[error("Invalid column range \"{range}\" for sheet \"{sheet}\": {violation}")]
    InvalidRangeBounds {
        range: String,
        sheet: String,
        violation: BoundViolation,
    },
}

impl RangeError {
    /// Syntax errors, as opposed to well-formed ranges with bad bounds.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, RangeError::InvalidRangeBounds { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Start,
    End,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Start => write!(f, "start"),
            Side::End => write!(f, "end"),
        }
    }
}

/// Which bound of a well-formed range is unacceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundViolation {
    ColumnOrder { start: String, end: String },
    RowOrder { start: u32, end: u32 },
    ColumnBelowMinimum { side: Side },
    RowBelowMinimum { side: Side },
}

impl fmt::Display for BoundViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColumnOrder { start, end } => write!(
                f,
                "start column \"{start}\" must be before or equal to end column \"{end}\""
            ),
            Self::RowOrder { start, end } => write!(
                f,
                "start row {start} must be before or equal to end row {end}"
            ),
            Self::ColumnBelowMinimum { side } => {
                write!(f, "{side} column must be at least \"A\"")
            }
            Self::RowBelowMinimum { side } => write!(f, "{side} row must be at least 1"),
        }
    }
}

/// Record of a range narrowed to the sheet's live dimensions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Capping {
    pub requested: String,
    pub capped: String,
    pub sheet_rows: u32,
    pub sheet_columns: u32,
}

impl fmt::Display for Capping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "range {} exceeds sheet dimensions ({} columns, {} rows), capped to {}",
            self.requested, self.sheet_columns, self.sheet_rows, self.capped,
        )
    }
}

/// Normalized, sheet-bounded range. `end_row == None` means "to the last
/// row of the sheet" and is fetched page by page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedRange {
    pub start_column: u32,
    pub end_column: u32,
    pub start_row: u32,
    pub end_row: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capping: Option<Capping>,
}

impl ResolvedRange {
    /// Every column of the sheet, every row, paginated.
    pub fn whole_sheet(column_count: u32) -> Self {
        Self {
            start_column: 1,
            end_column: column_count.max(1),
            start_row: 1,
            end_row: None,
            capping: None,
        }
    }

    /// `(start_column, end_column, start_row, end_row)`
    pub fn bounds(&self) -> (u32, u32, u32, Option<u32>) {
        (self.start_column, self.end_column, self.start_row, self.end_row)
    }

    pub fn is_bounded(&self) -> bool {
        self.end_row.is_some()
    }

    /// A1 form without a sheet prefix: `A1:E10`, or `A1:E` when unbound.
    pub fn a1(&self) -> String {
        format_a1(self.start_column, Some(self.start_row), self.end_column, self.end_row)
    }
}

impl fmt::Display for ResolvedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.a1())
    }
}

fn format_a1(start_column: u32, start_row: Option<u32>, end_column: u32, end_row: Option<u32>) -> String {
    let cell = |column: u32, row: Option<u32>| match row {
        Some(row) => format!("{}{}", column_to_letters(column), row),
        None => column_to_letters(column),
    };
    format!("{}:{}", cell(start_column, start_row), cell(end_column, end_row))
}

/// Parse, validate and cap `range` against a sheet of
/// `sheet_rows` x `sheet_columns`.
///
/// Validation order (first violation wins): column order, row order when
/// both rows are present, minimum bounds.
pub fn resolve(
    range: &str,
    sheet_rows: u32,
    sheet_columns: u32,
    sheet_title: &str,
) -> Result<ResolvedRange, RangeError> {
    let parts: Vec<&str> = range.split(':').collect();
    if parts.len() != 2 {
        return Err(RangeError::InvalidRangeFormat {
            range: range.to_string(),
            sheet: sheet_title.to_string(),
        });
    }

    let parse = |token: &str| -> Result<CellRef, RangeError> {
        parse_cell_ref(token).map_err(|_| RangeError::InvalidRangeCell {
            range: range.to_string(),
            sheet: sheet_title.to_string(),
            token: token.to_string(),
        })
    };
    let start = parse(parts[0])?;
    let end = parse(parts[1])?;

    let bounds_error = |violation: BoundViolation| RangeError::InvalidRangeBounds {
        range: range.to_string(),
        sheet: sheet_title.to_string(),
        violation,
    };

    if start.column > end.column {
        return Err(bounds_error(BoundViolation::ColumnOrder {
            start: column_to_letters(start.column),
            end: column_to_letters(end.column),
        }));
    }

    if let (Some(start_row), Some(end_row)) = (start.row, end.row) {
        if start_row > end_row {
            return Err(bounds_error(BoundViolation::RowOrder {
                start: start_row,
                end: end_row,
            }));
        }
    }

    if start.column < 1 {
        return Err(bounds_error(BoundViolation::ColumnBelowMinimum { side: Side::Start }));
    }
    if start.row == Some(0) {
        return Err(bounds_error(BoundViolation::RowBelowMinimum { side: Side::Start }));
    }
    if end.row == Some(0) {
        return Err(bounds_error(BoundViolation::RowBelowMinimum { side: Side::End }));
    }

    let column_limit = sheet_columns.max(1);
    let row_limit = sheet_rows.max(1);

    let start_column = start.column.min(column_limit);
    let end_column = end.column.min(column_limit);
    let start_row = start.row.unwrap_or(1).min(row_limit);
    let end_row = end.row.map(|row| row.min(row_limit));

    let was_capped = start_column != start.column
        || end_column != end.column
        || start.row.map_or(false, |row| row != start_row)
        || end.row != end_row;

    let capping = was_capped.then(|| Capping {
        requested: format_a1(start.column, start.row, end.column, end.row),
        capped: format_a1(start_column, Some(start_row), end_column, end_row),
        sheet_rows,
        sheet_columns,
    });

    Ok(ResolvedRange {
        start_column,
        end_column,
        start_row,
        end_row,
        capping,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(range: &str, rows: u32, columns: u32) -> (u32, u32, u32, Option<u32>) {
        resolve(range, rows, columns, "Sheet1").unwrap().bounds()
    }

    #[test]
    fn test_resolve_columns_only() {
        let resolved = resolve("A:E", 1000, 26, "Sheet1").unwrap();
        assert_eq!(resolved.bounds(), (1, 5, 1, None));
        assert!(resolved.capping.is_none());
        assert!(!resolved.is_bounded());
    }

    #[test]
    fn test_resolve_bounded_and_partial_forms() {
        assert_eq!(bounds("A1:E10", 1000, 26), (1, 5, 1, Some(10)));
        assert_eq!(bounds("A10:E", 1000, 26), (1, 5, 10, None));
        assert_eq!(bounds("A:E10", 1000, 26), (1, 5, 1, Some(10)));
        assert_eq!(bounds("A1:A1", 1000, 26), (1, 1, 1, Some(1)));
        assert_eq!(bounds("a1:e10", 1000, 26), (1, 5, 1, Some(10)));
        assert_eq!(bounds("AA:ZZ", 1000, 800), (27, 702, 1, None));
    }

    #[test]
    fn test_resolve_caps_columns() {
        let resolved = resolve("A:Z", 1000, 10, "Sheet1").unwrap();
        assert_eq!(resolved.bounds(), (1, 10, 1, None));
        let capping = resolved.capping.unwrap();
        assert_eq!(capping.requested, "A:Z");
        assert_eq!(capping.capped, "A1:J");
        assert_eq!(capping.sheet_columns, 10);
    }

    #[test]
    fn test_resolve_caps_rows() {
        let resolved = resolve("B5:C5000", 1200, 26, "Sheet1").unwrap();
        assert_eq!(resolved.bounds(), (2, 3, 5, Some(1200)));
        assert_eq!(resolved.capping.unwrap().capped, "B5:C1200");

        let resolved = resolve("A2000:C", 1200, 26, "Sheet1").unwrap();
        assert_eq!(resolved.bounds(), (1, 3, 1200, None));
        assert!(resolved.capping.is_some());
    }

    #[test]
    fn test_resolve_caps_bounds_past_u32() {
        let resolved = resolve("A1:E99999999999", 1200, 26, "Sheet1").unwrap();
        assert_eq!(resolved.bounds(), (1, 5, 1, Some(1200)));
        assert_eq!(resolved.capping.unwrap().capped, "A1:E1200");

        let resolved = resolve("A:AAAAAAAAAAAAAAAAAAAAAA", 1200, 26, "Sheet1").unwrap();
        assert_eq!(resolved.bounds(), (1, 26, 1, None));
        assert_eq!(resolved.capping.unwrap().capped, "A1:Z");
    }

    #[test]
    fn test_resolve_caps_start_beyond_sheet() {
        let resolved = resolve("M:Z", 100, 10, "Sheet1").unwrap();
        assert_eq!(resolved.bounds(), (10, 10, 1, None));
    }

    #[test]
    fn test_resolve_column_order_error() {
        let err = resolve("E:A", 1000, 26, "Sheet1").unwrap_err();
        assert_eq!(
            err,
            RangeError::InvalidRangeBounds {
                range: "E:A".into(),
                sheet: "Sheet1".into(),
                violation: BoundViolation::ColumnOrder { start: "E".into(), end: "A".into() },
            }
        );
        let msg = err.to_string();
        assert!(msg.contains("\"E\"") && msg.contains("\"A\""), "message: {}", msg);
    }

    #[test]
    fn test_resolve_row_order_error() {
        let err = resolve("A20:E10", 1000, 26, "Sheet1").unwrap_err();
        assert!(matches!(
            err,
            RangeError::InvalidRangeBounds {
                violation: BoundViolation::RowOrder { start: 20, end: 10 },
                ..
            }
        ));
        let msg = err.to_string();
        assert!(msg.contains("20") && msg.contains("10"), "message: {}", msg);
    }

    #[test]
    fn test_resolve_minimum_row_error() {
        let err = resolve("A0:E10", 1000, 26, "Sheet1").unwrap_err();
        assert!(matches!(
            err,
            RangeError::InvalidRangeBounds {
                violation: BoundViolation::RowBelowMinimum { side: Side::Start },
                ..
            }
        ));
        assert!(err.to_string().contains("at least 1"));

        let err = resolve("A:E0", 1000, 26, "Sheet1").unwrap_err();
        assert!(matches!(
            err,
            RangeError::InvalidRangeBounds {
                violation: BoundViolation::RowBelowMinimum { side: Side::End },
                ..
            }
        ));
    }

    #[test]
    fn test_resolve_column_order_checked_before_rows() {
        let err = resolve("E20:A10", 1000, 26, "Sheet1").unwrap_err();
        assert!(matches!(
            err,
            RangeError::InvalidRangeBounds { violation: BoundViolation::ColumnOrder { .. }, .. }
        ));
    }

    #[test]
    fn test_resolve_malformed_before_dimensions() {
        // Zero-sized sheet: malformed input must fail on syntax alone.
        for range in ["A-E", "A:B:C", "A1E10", "A", ""] {
            let err = resolve(range, 0, 0, "Sheet1").unwrap_err();
            assert!(
                matches!(err, RangeError::InvalidRangeFormat { .. }),
                "range {:?}: {:?}",
                range,
                err,
            );
            assert!(err.is_malformed());
        }
        for range in [":E10", "A1:", "A@:E#", "A 1:E 10", "1:100"] {
            let err = resolve(range, 0, 0, "Sheet1").unwrap_err();
            assert!(
                matches!(err, RangeError::InvalidRangeCell { .. }),
                "range {:?}: {:?}",
                range,
                err,
            );
            assert!(err.is_malformed());
        }
    }

    #[test]
    fn test_whole_sheet() {
        let range = ResolvedRange::whole_sheet(7);
        assert_eq!(range.bounds(), (1, 7, 1, None));
        assert_eq!(range.a1(), "A1:G");
    }
}
