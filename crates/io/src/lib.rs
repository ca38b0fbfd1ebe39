// Tabular output: header assembly, sinks, manifests

pub mod csv;
pub mod manifest;
pub mod output;
pub mod sanitize;

pub use csv::{CsvSink, CsvTarget};
pub use manifest::{manifest_path, write_manifest, Manifest};
pub use output::{MemorySink, OutputAssembler, OutputError, OutputLayout, OutputSummary, RowSink};
pub use sanitize::sanitize;
