//! Header-row semantics for an export.

use serde::Serialize;

/// How many leading rows of the first page carry the header.
///
/// Resolved once from configuration; the first row is never inspected to
/// guess whether it "looks like" a header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum HeaderMode {
    /// No header in the data; column letters are generated instead.
    NoHeader,
    /// Row `n` (1-based) of the first page is the header.
    ExplicitDepth(u32),
}

impl HeaderMode {
    pub fn from_rows(rows: u32) -> Self {
        if rows == 0 {
            HeaderMode::NoHeader
        } else {
            HeaderMode::ExplicitDepth(rows)
        }
    }

    pub fn depth(&self) -> u32 {
        match self {
            HeaderMode::NoHeader => 0,
            HeaderMode::ExplicitDepth(n) => *n,
        }
    }
}
