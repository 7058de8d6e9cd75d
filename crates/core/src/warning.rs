//! Non-fatal run warnings.
//!
//! Everything that can go wrong without invalidating the run ends up here
//! and is returned to the caller next to the context document.

use crate::error::NormalizeError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunWarning {
    /// A raw record could not be normalized and was skipped.
    MalformedRecord { source_ref: String, reason: String },

    /// Two notes declared the same alias; the first registration was kept.
    AliasConflict {
        alias: String,
        kept: String,
        rejected: String,
    },
}

impl From<NormalizeError> for RunWarning {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::MalformedRecord { source_ref, reason } => {
                Self::MalformedRecord { source_ref, reason }
            }
        }
    }
}

impl std::fmt::Display for RunWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedRecord { source_ref, reason } => {
                write!(f, "skipped malformed record {source_ref}: {reason}")
            }
            Self::AliasConflict {
                alias,
                kept,
                rejected,
            } => write!(
                f,
                "alias '{alias}' declared by both '{kept}' and '{rejected}'; keeping '{kept}'"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_conflict_names_both_notes() {
        let w = RunWarning::AliasConflict {
            alias: "X".into(),
            kept: "Alpha".into(),
            rejected: "Beta".into(),
        };
        let text = w.to_string();
        assert!(text.contains("Alpha"));
        assert!(text.contains("Beta"));
    }

    #[test]
    fn malformed_error_becomes_warning() {
        let w: RunWarning = NormalizeError::malformed("slack:general/?", "missing ts").into();
        assert!(matches!(w, RunWarning::MalformedRecord { .. }));
        let json = serde_json::to_string(&w).unwrap();
        assert!(json.contains("malformed_record"));
    }
}
