//! `sheetx-core`: A1 notation and range resolution.
//!
//! Pure crate: no network, no filesystem. Everything here runs before the
//! first request to the spreadsheet service is made.

pub mod header;
pub mod notation;
pub mod range;

pub use header::HeaderMode;
pub use notation::{column_to_letters, letters_to_column, parse_cell_ref, CellRef};
pub use range::{resolve, BoundViolation, Capping, RangeError, ResolvedRange, Side};
