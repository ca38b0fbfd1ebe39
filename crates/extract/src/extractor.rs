//! Job runner: every enabled sheet of a configuration, one after another.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use sheetx_config::SheetDescriptor;
use sheetx_core::{resolve, ResolvedRange};
use sheetx_io::{write_manifest, CsvTarget, OutputAssembler, OutputLayout};
use sheetx_sheets_client::{SheetsApi, Spreadsheet};

use crate::error::{export_failure, is_skippable, metadata_failure, ExtractError};
use crate::pagination::{self, ExportError, SheetRef, DEFAULT_FETCH_ROWS};

/// `fileTitle -> sheetTitle -> "success"`
pub type Extracted = BTreeMap<String, BTreeMap<String, String>>;

/// What the CLI prints on stdout after a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub status: &'static str,
    pub extracted: Extracted,
}

impl RunReport {
    pub fn ok(extracted: Extracted) -> Self {
        Self {
            status: "ok",
            extracted,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    pub data_dir: PathBuf,
    pub output_bucket: String,
    pub fetch_rows: u32,
}

impl ExtractorOptions {
    pub fn new(data_dir: impl Into<PathBuf>, output_bucket: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            output_bucket: output_bucket.into(),
            fetch_rows: DEFAULT_FETCH_ROWS,
        }
    }
}

enum SheetOutcome {
    Exported { rows: usize },
    Skipped,
}

pub struct Extractor<A: SheetsApi> {
    api: A,
    options: ExtractorOptions,
}

impl<A: SheetsApi> Extractor<A> {
    pub fn new(api: A, options: ExtractorOptions) -> Self {
        Self { api, options }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Export each enabled sheet in order. The first failure ends the job;
    /// sheets already written stay on disk.
    pub fn run(&mut self, sheets: &[SheetDescriptor]) -> Result<Extracted, ExtractError> {
        let mut extracted = Extracted::new();

        for sheet in sheets.iter().filter(|s| s.enabled) {
            match self.extract_sheet(sheet)? {
                SheetOutcome::Exported { rows } => {
                    log::debug!("sheet \"{}\": {} rows written", sheet.sheet_title, rows);
                    extracted
                        .entry(sheet.file_title.clone())
                        .or_default()
                        .insert(sheet.sheet_title.clone(), "success".to_string());
                }
                SheetOutcome::Skipped => {}
            }
        }

        Ok(extracted)
    }

    fn extract_sheet(&mut self, sheet: &SheetDescriptor) -> Result<SheetOutcome, ExtractError> {
        let spreadsheet = match self.api.spreadsheet(&sheet.file_id) {
            Ok(spreadsheet) => spreadsheet,
            Err(e) if is_skippable(&e) => return Ok(skip(sheet)),
            Err(e) => return Err(metadata_failure(e, sheet)),
        };
        log::info!("Obtained spreadsheet metadata");

        log::info!("Extracting sheet {}", sheet.sheet_title);
        let target = CsvTarget::new(&self.options.data_dir, &sheet.file_id, &sheet.sheet_id);
        match self.export(&spreadsheet, sheet, &target) {
            Ok(rows) => Ok(SheetOutcome::Exported { rows }),
            Err(e) => {
                target.discard();
                match e {
                    ExportError::Client(client) if is_skippable(&client) => Ok(skip(sheet)),
                    e => Err(export_failure(e, sheet)),
                }
            }
        }
    }

    fn export(
        &mut self,
        spreadsheet: &Spreadsheet,
        sheet: &SheetDescriptor,
        target: &CsvTarget,
    ) -> Result<usize, ExportError> {
        let tab = spreadsheet.sheet_by_id(&sheet.sheet_id)?;
        let dims = tab.dimensions();

        let range = match sheet.column_range() {
            Some(raw) => resolve(raw, dims.row_count, dims.column_count, tab.title())?,
            None => ResolvedRange::whole_sheet(dims.column_count),
        };

        let layout = OutputLayout {
            header: sheet.header_mode(),
            sanitize: sheet.header.sanitize,
            start_row: range.start_row,
            start_column: range.start_column,
        };
        let opener = target.clone();
        let bucket = self.options.output_bucket.clone();
        let table = sheet.output_table.clone();
        let mut output = OutputAssembler::new(layout, move || {
            let sink = opener.create()?;
            write_manifest(opener.csv_path(), &bucket, &table)?;
            Ok(sink)
        });

        let sheet_ref = SheetRef {
            spreadsheet_id: &spreadsheet.spreadsheet_id,
            title: tab.title(),
            row_count: dims.row_count,
        };
        pagination::export(
            &mut self.api,
            sheet_ref,
            &range,
            self.options.fetch_rows,
            |batch, offset| output.consume(batch, offset),
        )?;

        let summary = output.finalize()?;
        Ok(summary.map_or(0, |s| s.rows))
    }
}

fn skip(sheet: &SheetDescriptor) -> SheetOutcome {
    log::warn!("You don't have access to Google Drive resource.");
    log::debug!("skipping sheet \"{}\" of \"{}\"", sheet.sheet_title, sheet.file_title);
    SheetOutcome::Skipped
}
