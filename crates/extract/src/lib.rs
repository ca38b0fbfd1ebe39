//! `sheetx-extract`: paginated export of configured sheets.
//!
//! Wires the range resolver, the Sheets client and the output assembler
//! together. Knows nothing about process exit codes or flags.

pub mod error;
pub mod extractor;
pub mod pagination;

pub use error::ExtractError;
pub use extractor::{Extracted, Extractor, ExtractorOptions, RunReport};
pub use pagination::{export, ExportError, ExportStats, RowWindows, SheetRef, DEFAULT_FETCH_ROWS};
