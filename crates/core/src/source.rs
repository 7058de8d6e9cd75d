//! Source loader trait: the boundary to calendar, mail, task, chat and
//! file providers.
//!
//! Loaders do all the I/O and hand the core complete in-memory batches.

use crate::error::{LoadError, NormalizeError};
use crate::raw::RawRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// All raw records one loader produced, in provider order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceBatch {
    /// The loader name, e.g. "journals" or "records/events.jsonl".
    pub source: String,
    pub records: Vec<RawRecord>,
    /// Records the loader could not decode at all; reported as warnings
    /// next to the ones the normalizer rejects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<NormalizeError>,
}

impl SourceBatch {
    pub fn new(source: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self {
            source: source.into(),
            records,
            rejected: Vec::new(),
        }
    }

    pub fn with_rejected(mut self, rejected: Vec<NormalizeError>) -> Self {
        self.rejected = rejected;
        self
    }
}

/// A provider of raw records.
///
/// Implementations: journal directory, notes directory, JSON-lines dumps.
#[async_trait]
pub trait SourceLoader: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Fetch every record this source has for the run.
    async fn load(&self) -> Result<SourceBatch, LoadError>;
}
