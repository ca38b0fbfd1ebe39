// CSV output target

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::manifest::manifest_path;
use crate::output::{OutputError, RowSink};

/// CSV file sink. The header is simply the first record.
pub struct CsvSink {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl CsvSink {
    pub fn create(path: &Path) -> Result<Self, OutputError> {
        let file = File::create(path).map_err(|e| io_error(path, e))?;
        let writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);
        Ok(Self {
            writer,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RowSink for CsvSink {
    fn write_header(&mut self, header: &[String]) -> Result<(), OutputError> {
        self.write_row(header)
    }

    fn write_row(&mut self, row: &[String]) -> Result<(), OutputError> {
        self.writer
            .write_record(row)
            .map_err(|e| OutputError::Csv(e.to_string()))
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        self.writer.flush().map_err(|e| io_error(&self.path, e))
    }
}

/// File layout of one sheet export: `{data_dir}/out/tables/{fileId}_{sheetId}.csv`
/// plus its manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTarget {
    csv_path: PathBuf,
}

impl CsvTarget {
    pub fn new(data_dir: &Path, file_id: &str, sheet_id: &str) -> Self {
        let csv_path = data_dir
            .join("out")
            .join("tables")
            .join(format!("{}_{}.csv", file_id, sheet_id));
        Self { csv_path }
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn manifest_path(&self) -> PathBuf {
        manifest_path(&self.csv_path)
    }

    /// Create the tables directory and an empty CSV file.
    pub fn create(&self) -> Result<CsvSink, OutputError> {
        if let Some(dir) = self.csv_path.parent() {
            fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        }
        log::debug!("creating {}", self.csv_path.display());
        CsvSink::create(&self.csv_path)
    }

    /// Remove whatever this export left behind. Missing files are fine.
    pub fn discard(&self) {
        for path in [self.csv_path.clone(), self.manifest_path()] {
            match fs::remove_file(&path) {
                Ok(()) => log::debug!("removed partial output {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("cannot remove {}: {}", path.display(), e),
            }
        }
    }
}

pub(crate) fn io_error(path: &Path, e: std::io::Error) -> OutputError {
    OutputError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{OutputAssembler, OutputLayout};
    use sheetx_core::HeaderMode;
    use tempfile::tempdir;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_target_paths() {
        let target = CsvTarget::new(Path::new("/data"), "file-1", "0");
        assert_eq!(target.csv_path(), Path::new("/data/out/tables/file-1_0.csv"));
        assert_eq!(
            target.manifest_path(),
            PathBuf::from("/data/out/tables/file-1_0.csv.manifest")
        );
    }

    #[test]
    fn test_csv_quoting_and_newline_terminator() {
        let dir = tempdir().unwrap();
        let target = CsvTarget::new(dir.path(), "f", "1");
        let mut sink = target.create().unwrap();
        sink.write_header(&row(&["name", "note"])).unwrap();
        sink.write_row(&row(&["Al", "says \"hi\", twice"])).unwrap();
        sink.write_row(&row(&["Bo", "line1\nline2"])).unwrap();
        sink.finish().unwrap();

        let content = fs::read_to_string(target.csv_path()).unwrap();
        assert_eq!(
            content,
            "name,note\nAl,\"says \"\"hi\"\", twice\"\nBo,\"line1\nline2\"\n"
        );
    }

    #[test]
    fn test_assembler_into_csv() {
        let dir = tempdir().unwrap();
        let target = CsvTarget::new(dir.path(), "f", "2");
        let opener = target.clone();
        let layout = OutputLayout {
            header: HeaderMode::ExplicitDepth(1),
            sanitize: true,
            start_row: 1,
            start_column: 1,
        };
        let mut out = OutputAssembler::new(layout, move || opener.create());
        out.consume(&[row(&["Full Name", "Age"]), row(&["Al", "30", "extra"])], 1)
            .unwrap();
        out.consume(&[row(&["Bo"])], 1001).unwrap();
        out.finalize().unwrap();

        let content = fs::read_to_string(target.csv_path()).unwrap();
        assert_eq!(content, "Full_Name,Age\nAl,30\nBo,\n");
    }

    #[test]
    fn test_discard_removes_outputs() {
        let dir = tempdir().unwrap();
        let target = CsvTarget::new(dir.path(), "f", "3");
        target.create().unwrap();
        fs::write(target.manifest_path(), "{}").unwrap();

        target.discard();
        assert!(!target.csv_path().exists());
        assert!(!target.manifest_path().exists());

        // Second discard is a no-op.
        target.discard();
    }
}
