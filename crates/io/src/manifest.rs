// Sidecar manifest for an output table

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::csv::io_error;
use crate::output::OutputError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub destination: String,
    pub incremental: bool,
}

impl Manifest {
    pub fn full_load(bucket: &str, table: &str) -> Self {
        Self {
            destination: format!("{}.{}", bucket, table),
            incremental: false,
        }
    }
}

/// `<csv>.manifest`
pub fn manifest_path(csv_path: &Path) -> PathBuf {
    let mut name = csv_path.as_os_str().to_owned();
    name.push(".manifest");
    PathBuf::from(name)
}

pub fn write_manifest(csv_path: &Path, bucket: &str, table: &str) -> Result<PathBuf, OutputError> {
    let path = manifest_path(csv_path);
    let manifest = Manifest::full_load(bucket, table);
    let json = serde_json::to_string(&manifest).map_err(|e| OutputError::Manifest(e.to_string()))?;
    std::fs::write(&path, json).map_err(|e| io_error(&path, e))?;
    Ok(path)
}
