//! Pagination engine.
//!
//! A bounded range is fetched in one window. An unbound range is walked in
//! windows of `fetch_rows` rows from its start row until the cursor passes
//! the sheet's last row.

use sheetx_core::{RangeError, ResolvedRange};
use sheetx_io::OutputError;
use sheetx_sheets_client::{ClientError, FetchWindow, SheetsApi};

pub const DEFAULT_FETCH_ROWS: u32 = 1000;

/// The tab being exported, as reported by spreadsheet metadata.
#[derive(Debug, Clone, Copy)]
pub struct SheetRef<'a> {
    pub spreadsheet_id: &'a str,
    pub title: &'a str,
    pub row_count: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Range(#[from] RangeError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub fetches: u32,
    pub batches: u32,
    pub rows: usize,
}

/// Row spans `(first, last)` to request, in cursor order.
#[derive(Debug, Clone)]
pub struct RowWindows {
    next: Option<u32>,
    end_row: Option<u32>,
    row_count: u32,
    fetch_rows: u32,
}

impl RowWindows {
    pub fn new(range: &ResolvedRange, row_count: u32, fetch_rows: u32) -> Self {
        Self {
            next: Some(range.start_row),
            end_row: range.end_row,
            row_count,
            fetch_rows: fetch_rows.max(1),
        }
    }
}

impl Iterator for RowWindows {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<(u32, u32)> {
        let offset = self.next?;

        if let Some(end_row) = self.end_row {
            self.next = None;
            return Some((offset, end_row));
        }

        if offset > self.row_count {
            self.next = None;
            return None;
        }
        let last = offset
            .saturating_add(self.fetch_rows - 1)
            .min(self.row_count);
        self.next = offset.checked_add(self.fetch_rows);
        Some((offset, last))
    }
}

/// Fetch every window of `range` and hand each non-empty batch to
/// `on_batch` together with the row it starts at.
pub fn export<A, F>(
    api: &mut A,
    sheet: SheetRef<'_>,
    range: &ResolvedRange,
    fetch_rows: u32,
    mut on_batch: F,
) -> Result<ExportStats, ExportError>
where
    A: SheetsApi + ?Sized,
    F: FnMut(&[Vec<String>], u32) -> Result<(), OutputError>,
{
    if let Some(capping) = &range.capping {
        log::warn!("Sheet \"{}\": {}", sheet.title, capping);
    }

    let mut stats = ExportStats::default();
    for (first, last) in RowWindows::new(range, sheet.row_count, fetch_rows) {
        log::info!("Extracting rows {} to {}", first, last);
        let window = FetchWindow::new(
            sheet.spreadsheet_id,
            sheet.title,
            (range.start_column, range.end_column),
            (first, last),
        );

        let rows = api.values(&window)?;
        stats.fetches += 1;
        if rows.is_empty() {
            log::debug!("no values in {}", window.range);
            continue;
        }

        on_batch(&rows, first)?;
        stats.batches += 1;
        stats.rows += rows.len();
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetx_core::resolve;
    use sheetx_sheets_client::Spreadsheet;

    /// Serves a sheet of `rows` x 2 cells and records requested ranges.
    struct FakeSheet {
        rows: u32,
        requested: Vec<String>,
    }

    impl SheetsApi for FakeSheet {
        fn spreadsheet(&mut self, _file_id: &str) -> Result<Spreadsheet, ClientError> {
            unreachable!("pagination never asks for metadata")
        }

        fn values(&mut self, window: &FetchWindow) -> Result<Vec<Vec<String>>, ClientError> {
            self.requested.push(window.range.clone());
            let span = window.range.rsplit('!').next().unwrap();
            let (start, end) = span.split_once(':').unwrap();
            let first: u32 = start.trim_start_matches(char::is_alphabetic).parse().unwrap();
            let last: u32 = end.trim_start_matches(char::is_alphabetic).parse().unwrap();
            Ok((first..=last.min(self.rows))
                .map(|r| vec![format!("r{}", r), "x".to_string()])
                .collect())
        }
    }

    fn sheet(rows: u32) -> SheetRef<'static> {
        SheetRef {
            spreadsheet_id: "file-1",
            title: "Data",
            row_count: rows,
        }
    }

    #[test]
    fn test_unbound_range_pages_through_sheet() {
        let mut api = FakeSheet { rows: 2500, requested: Vec::new() };
        let range = resolve("A:B", 2500, 2, "Data").unwrap();
        let mut offsets = Vec::new();

        let stats = export(&mut api, sheet(2500), &range, 1000, |batch, offset| {
            offsets.push((offset, batch.len()));
            Ok(())
        })
        .unwrap();

        assert_eq!(offsets, vec![(1, 1000), (1001, 1000), (2001, 500)]);
        assert_eq!(stats, ExportStats { fetches: 3, batches: 3, rows: 2500 });
        assert_eq!(
            api.requested,
            vec!["Data!A1:B1000", "Data!A1001:B2000", "Data!A2001:B2500"]
        );
    }

    #[test]
    fn test_bounded_range_single_fetch() {
        let mut api = FakeSheet { rows: 2500, requested: Vec::new() };
        let range = resolve("B5:C2400", 2500, 5, "Data").unwrap();

        let stats = export(&mut api, sheet(2500), &range, 1000, |_, offset| {
            assert_eq!(offset, 5);
            Ok(())
        })
        .unwrap();

        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.rows, 2396);
        assert_eq!(api.requested, vec!["Data!B5:C2400"]);
    }

    #[test]
    fn test_start_row_offsets_cursor() {
        let range = resolve("A10:E", 2500, 26, "Data").unwrap();
        let windows: Vec<_> = RowWindows::new(&range, 2500, 1000).collect();
        assert_eq!(windows, vec![(10, 1009), (1010, 2009), (2010, 2500)]);
    }

    #[test]
    fn test_window_count_bound() {
        for (rows, fetch) in [(0u32, 1000u32), (1, 1000), (999, 1000), (1000, 1000), (1001, 1000), (7, 3)] {
            let range = ResolvedRange::whole_sheet(3);
            let count = RowWindows::new(&range, rows, fetch).count() as u32;
            assert_eq!(count, (rows + fetch - 1) / fetch, "rows={} fetch={}", rows, fetch);
        }
    }

    #[test]
    fn test_zero_fetch_rows_still_terminates() {
        let range = ResolvedRange::whole_sheet(1);
        assert_eq!(RowWindows::new(&range, 3, 0).count(), 3);
    }

    #[test]
    fn test_cursor_near_u32_max_terminates() {
        let range = ResolvedRange::whole_sheet(1);
        let windows: Vec<_> = RowWindows::new(&range, u32::MAX, u32::MAX - 1).collect();
        assert_eq!(windows, vec![(1, u32::MAX - 1), (u32::MAX, u32::MAX)]);
    }

    #[test]
    fn test_empty_batches_skipped() {
        let mut api = FakeSheet { rows: 0, requested: Vec::new() };
        let range = resolve("A:B", 1500, 2, "Data").unwrap();
        let mut calls = 0;
        let stats = export(&mut api, sheet(1500), &range, 1000, |_, _| {
            calls += 1;
            Ok(())
        })
        .unwrap();

        assert_eq!(calls, 0);
        assert_eq!(stats, ExportStats { fetches: 2, batches: 0, rows: 0 });
    }

    #[test]
    fn test_sheet_title_is_encoded_in_window() {
        let mut api = FakeSheet { rows: 3, requested: Vec::new() };
        let range = resolve("A1:C3", 3, 3, "Sheet 1").unwrap();
        let sheet = SheetRef { spreadsheet_id: "f", title: "Sheet 1", row_count: 3 };
        export(&mut api, sheet, &range, 1000, |_, _| Ok(())).unwrap();
        assert_eq!(api.requested, vec!["Sheet%201!A1:C3"]);
    }

    #[test]
    fn test_client_error_stops_export() {
        struct Failing;
        impl SheetsApi for Failing {
            fn spreadsheet(&mut self, _: &str) -> Result<Spreadsheet, ClientError> {
                unreachable!()
            }
            fn values(&mut self, _: &FetchWindow) -> Result<Vec<Vec<String>>, ClientError> {
                Err(ClientError::Network("reset".into()))
            }
        }

        let range = ResolvedRange::whole_sheet(2);
        let err = export(&mut Failing, sheet(10), &range, 1000, |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, ExportError::Client(ClientError::Network(_))));
    }
}
