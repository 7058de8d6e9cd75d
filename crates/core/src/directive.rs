//! Directives: operator instructions embedded in today's journal.
//!
//! Directives are extracted fresh on every run, only from the journal
//! entry dated "today", and handed to the summarizer verbatim. The core
//! never interprets them.

use serde::{Deserialize, Serialize};

/// One instruction addressed to the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    /// Position among the directives of the run (document order, from 0).
    pub order: usize,
    /// The instruction text following the trigger token.
    pub raw_text: String,
    /// Evidence id of the journal entry it came from.
    pub source_id: String,
    /// 1-based line number inside that entry.
    pub line: usize,
    /// Outline depth of the bullet (0 = top level).
    pub depth: usize,
}
