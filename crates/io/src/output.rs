//! Tabular output assembler.
//!
//! Batches arrive in increasing cursor order. The first non-empty batch
//! fixes the header and its width; every row written afterwards is cut or
//! padded to that width so the sink always sees rectangular data.

use sheetx_core::{column_to_letters, HeaderMode};

use crate::sanitize::sanitize;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("cannot write {path}: {message}")]
    Io { path: String, message: String },

    #[error("CSV write failed: {0}")]
    Csv(String),

    #[error("cannot serialize manifest: {0}")]
    Manifest(String),
}

/// A row-oriented writer. Header and data rows are kept apart so a sink
/// can treat the header as metadata.
pub trait RowSink {
    fn write_header(&mut self, header: &[String]) -> Result<(), OutputError>;
    fn write_row(&mut self, row: &[String]) -> Result<(), OutputError>;
    fn finish(&mut self) -> Result<(), OutputError>;
}

/// Collects rows in memory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemorySink {
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
    pub finished: bool,
}

impl RowSink for MemorySink {
    fn write_header(&mut self, header: &[String]) -> Result<(), OutputError> {
        self.header = Some(header.to_vec());
        Ok(())
    }

    fn write_row(&mut self, row: &[String]) -> Result<(), OutputError> {
        self.rows.push(row.to_vec());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        self.finished = true;
        Ok(())
    }
}

/// Where the exported rows sit in the sheet, and how the header is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLayout {
    pub header: HeaderMode,
    pub sanitize: bool,
    /// First row of the resolved range; a batch starting here is the first page.
    pub start_row: u32,
    /// First column of the resolved range, for synthetic letter headers.
    pub start_column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSummary {
    pub header: Vec<String>,
    pub rows: usize,
}

type Opener<S> = Box<dyn FnMut() -> Result<S, OutputError>>;

pub struct OutputAssembler<S: RowSink> {
    layout: OutputLayout,
    open: Opener<S>,
    sink: Option<S>,
    header: Option<Vec<String>>,
    /// Rows consumed while still looking for an explicit header row.
    pre_header_rows: u32,
    pre_header_width: usize,
    rows: usize,
}

impl<S: RowSink> OutputAssembler<S> {
    /// `open` creates the sink; it runs once, on the first non-empty batch.
    pub fn new(layout: OutputLayout, open: impl FnMut() -> Result<S, OutputError> + 'static) -> Self {
        Self {
            layout,
            open: Box::new(open),
            sink: None,
            header: None,
            pre_header_rows: 0,
            pre_header_width: 0,
            rows: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.sink.is_some()
    }

    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Feed one batch fetched at `cursor_offset` (1-based sheet row).
    pub fn consume(&mut self, batch: &[Vec<String>], cursor_offset: u32) -> Result<(), OutputError> {
        if batch.is_empty() {
            return Ok(());
        }
        let first_page = cursor_offset == self.layout.start_row;

        let mut sink = match self.sink.take() {
            Some(sink) => sink,
            None => (self.open)()?,
        };
        let result = self.consume_into(&mut sink, batch, first_page);
        self.sink = Some(sink);
        result
    }

    fn consume_into(
        &mut self,
        sink: &mut S,
        batch: &[Vec<String>],
        first_page: bool,
    ) -> Result<(), OutputError> {
        let mut rows = batch.iter();

        if self.header.is_none() {
            match self.layout.header {
                HeaderMode::NoHeader => {
                    let width = batch[0].len() as u32;
                    let header: Vec<String> = (0..width)
                        .map(|i| column_to_letters(self.layout.start_column + i))
                        .collect();
                    if first_page {
                        sink.write_header(&header)?;
                    }
                    self.header = Some(header);
                }
                HeaderMode::ExplicitDepth(depth) => {
                    for row in rows.by_ref() {
                        self.pre_header_width = self.pre_header_width.max(row.len());
                        if self.pre_header_rows + 1 < depth {
                            self.pre_header_rows += 1;
                            continue;
                        }
                        let mut header = row.clone();
                        if first_page && self.layout.sanitize {
                            header = header.iter().map(|c| sanitize(c)).collect();
                        }
                        normalize_width(&mut header, self.pre_header_width);
                        sink.write_header(&header)?;
                        self.header = Some(header);
                        break;
                    }
                    if self.header.is_none() {
                        // Batch ended above the header row; keep looking in the next one.
                        return Ok(());
                    }
                }
            }
        }

        let width = self.header.as_ref().map_or(0, Vec::len);
        let mut normalized = Vec::with_capacity(width);
        for row in rows {
            normalized.clear();
            normalized.extend(row.iter().take(width).cloned());
            normalize_width(&mut normalized, width);
            sink.write_row(&normalized)?;
            self.rows += 1;
        }
        Ok(())
    }

    /// Flush the sink. `None` when no batch ever carried data, in which
    /// case nothing was opened.
    pub fn finalize(mut self) -> Result<Option<OutputSummary>, OutputError> {
        let Some(mut sink) = self.sink.take() else {
            return Ok(None);
        };
        sink.finish()?;
        Ok(Some(OutputSummary {
            header: self.header.unwrap_or_default(),
            rows: self.rows,
        }))
    }

    /// Hand back the sink, for callers that inspect what was written.
    pub fn into_sink(self) -> Option<S> {
        self.sink
    }
}

/// Cut from the right or pad with empty fields to exactly `width` cells.
pub fn normalize_width(row: &mut Vec<String>, width: usize) {
    row.truncate(width);
    row.resize(width, String::new());
}
