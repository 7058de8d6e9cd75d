//! The context document: what the summarizer receives.
//!
//! Built once per run by the assembler and never mutated afterwards: all
//! fields are private and only exposed through shared references.

use crate::directive::Directive;
use crate::evidence::{Evidence, EvidenceKind};
use crate::task::EventWindow;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Whether the run ranked and truncated, or passed everything through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    Ranked,
    FullContext,
}

/// Task metadata at the head of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// "daily", "weekly" or "prepare_event".
    pub task: String,
    pub today: NaiveDate,
    /// Human label: the date, `2025-W22`, or the event title.
    pub label: String,
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<EventWindow>,
}

/// One Evidence item as it appears in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    #[serde(flatten)]
    pub evidence: Evidence,
    /// Relevance score; absent in full-context mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    /// Kept by the structured in-window floor regardless of the cap.
    #[serde(default)]
    pub protected: bool,
}

/// Statistics for a single evidence group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStats {
    pub kind: EvidenceKind,
    /// Items kept after ranking.
    pub items_included: usize,
    /// Items available before ranking.
    pub items_total: usize,
    /// Estimated tokens of the kept items.
    pub tokens: usize,
}

/// Information about items dropped from a group by the budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropInfo {
    pub kind: EvidenceKind,
    pub items_dropped: usize,
    pub reason: String,
}

/// Assembly metadata (mode, per-group stats, drops).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyMetadata {
    pub mode: ContextMode,
    pub groups: Vec<GroupStats>,
    pub drops: Vec<DropInfo>,
    pub total_tokens: usize,
}

/// The assembled, immutable context document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextDocument {
    task: TaskMetadata,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    events: Vec<DocumentEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tasks: Vec<DocumentEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    emails: Vec<DocumentEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    journals: Vec<DocumentEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    notes: Vec<DocumentEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    chat: Vec<DocumentEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    directives: Vec<Directive>,
    metadata: AssemblyMetadata,
}

/// Builder input for [`ContextDocument::new`]: one group per kind.
#[derive(Debug, Clone, Default)]
pub struct DocumentGroups {
    pub events: Vec<DocumentEntry>,
    pub tasks: Vec<DocumentEntry>,
    pub emails: Vec<DocumentEntry>,
    pub journals: Vec<DocumentEntry>,
    pub notes: Vec<DocumentEntry>,
    pub chat: Vec<DocumentEntry>,
}

impl DocumentGroups {
    pub fn group_mut(&mut self, kind: EvidenceKind) -> &mut Vec<DocumentEntry> {
        match kind {
            EvidenceKind::Event => &mut self.events,
            EvidenceKind::Task => &mut self.tasks,
            EvidenceKind::Email => &mut self.emails,
            EvidenceKind::JournalEntry => &mut self.journals,
            EvidenceKind::Note => &mut self.notes,
            EvidenceKind::ChatMessage => &mut self.chat,
        }
    }
}

impl ContextDocument {
    pub fn new(
        task: TaskMetadata,
        groups: DocumentGroups,
        directives: Vec<Directive>,
        metadata: AssemblyMetadata,
    ) -> Self {
        Self {
            task,
            events: groups.events,
            tasks: groups.tasks,
            emails: groups.emails,
            journals: groups.journals,
            notes: groups.notes,
            chat: groups.chat,
            directives,
            metadata,
        }
    }

    pub fn task(&self) -> &TaskMetadata {
        &self.task
    }

    pub fn group(&self, kind: EvidenceKind) -> &[DocumentEntry] {
        match kind {
            EvidenceKind::Event => &self.events,
            EvidenceKind::Task => &self.tasks,
            EvidenceKind::Email => &self.emails,
            EvidenceKind::JournalEntry => &self.journals,
            EvidenceKind::Note => &self.notes,
            EvidenceKind::ChatMessage => &self.chat,
        }
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn metadata(&self) -> &AssemblyMetadata {
        &self.metadata
    }

    /// Total Evidence items across all groups.
    pub fn evidence_count(&self) -> usize {
        EvidenceKind::ALL.iter().map(|k| self.group(*k).len()).sum()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
