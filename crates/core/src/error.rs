//! Error types for the Vea domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each pipeline stage has its own error enum; only
//! [`AssemblyError::IncompleteContext`] is fatal for a run; the other
//! stage errors are downgraded to warnings by the pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The top-level error type for all Vea operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Assembly errors ---
    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    // --- Loader errors ---
    #[error("Source error: {0}")]
    Load(#[from] LoadError),

    // --- Summarizer errors ---
    #[error("Summarizer error: {0}")]
    Summarize(#[from] SummarizeError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Stage errors ---

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NormalizeError {
    #[error("Malformed record {source_ref}: {reason}")]
    MalformedRecord { source_ref: String, reason: String },
}

impl NormalizeError {
    pub fn malformed(source_ref: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            source_ref: source_ref.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    #[error("Incomplete task context: {reason}")]
    IncompleteContext { reason: String },
}

impl AssemblyError {
    pub fn incomplete(reason: impl Into<String>) -> Self {
        Self::IncompleteContext {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },
}

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("Summarizer failed: {0}")]
    Failed(String),

    #[error("Summarizer I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_record_displays_source() {
        let err = NormalizeError::malformed("email:abc", "missing Date header");
        assert!(err.to_string().contains("email:abc"));
        assert!(err.to_string().contains("missing Date header"));
    }

    #[test]
    fn incomplete_context_converts_into_top_level() {
        let err: Error = AssemblyError::incomplete("no event resolvable").into();
        assert!(matches!(
            err,
            Error::Assembly(AssemblyError::IncompleteContext { .. })
        ));
        assert!(err.to_string().contains("no event resolvable"));
    }
}
