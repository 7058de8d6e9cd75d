//! JSON-lines provider dumps.
//!
//! Calendar, mail, task and chat fetchers write one [`RawRecord`] per line
//! (tagged by `kind`) into `<records_dir>/*.jsonl`; this loader reads them
//! back. Corrupted lines are skipped and reported, never fatal.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};
use vea_core::{LoadError, NormalizeError, RawRecord, SourceBatch, SourceLoader};

#[derive(Debug, Clone)]
pub struct JsonlRecordLoader {
    path: PathBuf,
    name: String,
}

impl JsonlRecordLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(file) => format!("records/{file}"),
            None => "records".to_string(),
        };
        Self { path, name }
    }

    /// One loader per `*.jsonl` file in `dir`, sorted by file name. A missing
    /// directory yields no loaders.
    pub fn discover(dir: &Path) -> Result<Vec<Self>, LoadError> {
        let entries = match std::fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(dir = %dir.display(), "Records directory not found");
                return Ok(vec![]);
            }
            Err(e) => {
                return Err(LoadError::Io {
                    path: dir.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext == "jsonl")
            })
            .collect();
        paths.sort();
        Ok(paths.into_iter().map(Self::new).collect())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse JSONL content into a batch named `source`. Blank lines are
/// ignored; a line that does not decode into a record is kept as a
/// rejected entry referencing `<source>:<line>`.
pub fn parse_records(content: &str, source: &str) -> SourceBatch {
    let mut records = Vec::new();
    let mut rejected = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RawRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(source, line = idx + 1, error = %e, "Skipping corrupted record");
                rejected.push(NormalizeError::malformed(
                    format!("{source}:{}", idx + 1),
                    format!("undecodable record: {e}"),
                ));
            }
        }
    }
    SourceBatch::new(source, records).with_rejected(rejected)
}

#[async_trait]
impl SourceLoader for JsonlRecordLoader {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<SourceBatch, LoadError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(file = %self.path.display(), "Records file not found");
                return Ok(SourceBatch::new(self.name.clone(), vec![]));
            }
            Err(e) => {
                return Err(LoadError::Io {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let batch = parse_records(&content, &self.name);
        info!(
            source = %self.name,
            count = batch.records.len(),
            rejected = batch.rejected.len(),
            "Loaded provider records"
        );
        Ok(batch)
    }
}
