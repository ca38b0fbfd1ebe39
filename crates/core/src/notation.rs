//! A1 notation codec.
//!
//! Columns are 1-based and map to letters with bijective base-26
//! (no zero digit): 1=A, 26=Z, 27=AA, 702=ZZ, 703=AAA.

use crate::range::RangeError;

/// A single-cell reference such as `A10` or a bare column such as `E`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRef {
    /// 1-based column index
    pub column: u32,
    /// 1-based row, `None` when the token carries no digits
    pub row: Option<u32>,
}

/// Convert a 1-based column index to its letter label.
///
/// Index 0 is outside the codec's domain and yields an empty string.
pub fn column_to_letters(index: u32) -> String {
    debug_assert!(index >= 1, "column index is 1-based");
    let mut letters = Vec::new();
    let mut n = index;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - rem - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Convert a letter label (case-insensitive) to its 1-based column index.
///
/// Returns `None` for an empty label or a non-letter character. A label
/// past the `u32` range saturates at `u32::MAX`.
pub fn letters_to_column(label: &str) -> Option<u32> {
    if label.is_empty() {
        return None;
    }
    let mut column: u32 = 0;
    for ch in label.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let value = (ch.to_ascii_uppercase() as u8 - b'A' + 1) as u32;
        column = column.saturating_mul(26).saturating_add(value);
    }
    Some(column)
}

/// Parse a token of the form `[A-Za-z]+[0-9]*`.
pub fn parse_cell_ref(token: &str) -> Result<CellRef, RangeError> {
    let invalid = || RangeError::InvalidCellReference {
        token: token.to_string(),
    };

    let split = token
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(token.len());
    let (letters, digits) = token.split_at(split);

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let column = letters_to_column(letters).ok_or_else(invalid)?;
    let row = if digits.is_empty() {
        None
    } else {
        // All digits at this point, so a parse failure can only be overflow.
        Some(digits.parse::<u32>().unwrap_or(u32::MAX))
    };

    Ok(CellRef { column, row })
}
