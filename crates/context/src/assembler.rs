//! Context assembly: the last stage of the pipeline.
//!
//! Merges task metadata, the ranked Evidence groups and the directive list
//! into one immutable [`ContextDocument`]:
//!
//! 1. **Task** (kind, window, label, event): fails if unusable
//! 2. **Directives**: in document order, never trimmed
//! 3. **Evidence groups**: events, tasks, emails, journals, notes, chat,
//!    each in ranker order
//!
//! # Determinism
//!
//! Assembly is deterministic: identical inputs always produce identical
//! outputs. No random or time-dependent logic is used during assembly.

use vea_core::{
    AssemblyError, AssemblyMetadata, ContextDocument, Directive, DocumentEntry, DocumentGroups,
    EvidenceKind, GroupStats, TaskContext, TaskDescriptor, TaskMetadata, Timestamp,
};

use crate::ranker::{RankedEvidence, RankedGroup};
use crate::token;

/// The context assembler. Stateless: create one and reuse it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Assemble the document.
    ///
    /// Fails with `IncompleteContext` only when the task context itself is
    /// unusable; empty groups are fine and simply absent from the output.
    pub fn assemble(
        &self,
        task: &TaskContext,
        ranked: RankedEvidence,
        directives: Vec<Directive>,
    ) -> Result<ContextDocument, AssemblyError> {
        let metadata = Self::task_metadata(task)?;

        let mut stats: Vec<GroupStats> = Vec::new();
        let mut groups = DocumentGroups::default();
        for group in ranked.groups {
            let (entries, group_stats) = Self::render_group(group);
            groups.group_mut(group_stats.kind).extend(entries);
            stats.push(group_stats);
        }
        // Kinds the ranker never produced still get a stats row.
        for kind in EvidenceKind::ALL {
            if !stats.iter().any(|s| s.kind == kind) {
                stats.push(Self::empty_stats(kind));
            }
        }
        stats.sort_by_key(|s| s.kind);

        let total_tokens = stats.iter().map(|s| s.tokens).sum::<usize>()
            + token::estimate_directive_tokens(&directives);

        Ok(ContextDocument::new(
            metadata,
            groups,
            directives,
            AssemblyMetadata {
                mode: ranked.mode,
                groups: stats,
                drops: ranked.drops,
                total_tokens,
            },
        ))
    }

    fn task_metadata(task: &TaskContext) -> Result<TaskMetadata, AssemblyError> {
        let (window_start, window_end) = task.window()?;
        let (kind, label) = match &task.descriptor {
            TaskDescriptor::Daily => ("daily", task.today.format("%Y-%m-%d").to_string()),
            TaskDescriptor::Weekly(week) => ("weekly", week.label()),
            TaskDescriptor::PrepareEvent(_) => {
                let event = task.event().ok_or_else(|| {
                    AssemblyError::incomplete("prepare-event run has no resolved event")
                })?;
                ("prepare_event", event.title.clone())
            }
        };
        Ok(TaskMetadata {
            task: kind.to_string(),
            today: task.today,
            label,
            window_start,
            window_end,
            event: task.event().cloned(),
        })
    }

    fn render_group(group: RankedGroup) -> (Vec<DocumentEntry>, GroupStats) {
        let tokens = group
            .entries
            .iter()
            .map(|e| token::estimate_evidence_tokens(&e.evidence))
            .sum();
        let stats = GroupStats {
            kind: group.kind,
            items_included: group.entries.len(),
            items_total: group.total,
            tokens,
        };
        (group.entries, stats)
    }

    fn empty_stats(kind: EvidenceKind) -> GroupStats {
        GroupStats {
            kind,
            items_included: 0,
            items_total: 0,
            tokens: 0,
        }
    }

    /// Plain-text rendition with one bracketed section per non-empty group.
    pub fn render_text(document: &ContextDocument) -> String {
        let task = document.task();
        let mut sections: Vec<String> = Vec::new();

        let mut header = format!(
            "[Task]\n{} {} ({} .. {})",
            task.task,
            task.label,
            task.window_start.format("%Y-%m-%d %H:%M"),
            task.window_end.format("%Y-%m-%d %H:%M")
        );
        if let Some(event) = &task.event {
            if !event.participants.is_empty() {
                header.push_str(&format!("\nParticipants: {}", event.participants.join(", ")));
            }
            if !event.description.is_empty() {
                header.push('\n');
                header.push_str(&event.description);
            }
        }
        sections.push(header);

        if !document.directives().is_empty() {
            let lines: Vec<String> = document
                .directives()
                .iter()
                .map(|d| format!("{}. {}", d.order + 1, d.raw_text))
                .collect();
            sections.push(format!("[Directives]\n{}", lines.join("\n")));
        }

        for kind in EvidenceKind::ALL {
            let entries = document.group(kind);
            if entries.is_empty() {
                continue;
            }
            let body: Vec<String> = entries.iter().map(render_entry).collect();
            sections.push(format!("[{}]\n{}", section_title(kind), body.join("\n")));
        }

        sections.join("\n\n")
    }
}

fn section_title(kind: EvidenceKind) -> &'static str {
    match kind {
        EvidenceKind::Event => "Events",
        EvidenceKind::Task => "Tasks",
        EvidenceKind::Email => "Emails",
        EvidenceKind::JournalEntry => "Journals",
        EvidenceKind::Note => "Notes",
        EvidenceKind::ChatMessage => "Chat",
    }
}

fn when(ts: &Timestamp) -> String {
    if ts.is_full_day() {
        return ts.date().format("%Y-%m-%d").to_string();
    }
    match ts {
        Timestamp::Instant { at } => at.format("%Y-%m-%d %H:%M").to_string(),
        Timestamp::Range { start, end } if start.date() == end.date() => {
            format!("{}-{}", start.format("%Y-%m-%d %H:%M"), end.format("%H:%M"))
        }
        Timestamp::Range { start, end } => format!(
            "{} .. {}",
            start.format("%Y-%m-%d %H:%M"),
            end.format("%Y-%m-%d %H:%M")
        ),
    }
}

fn render_entry(entry: &DocumentEntry) -> String {
    let e = &entry.evidence;
    let mut line = match &e.timestamp {
        Some(ts) => format!("- {} {}", when(ts), e.title),
        None => format!("- {}", e.title),
    };
    if !e.tags.is_empty() {
        let tags: Vec<&str> = e.tags.iter().map(String::as_str).collect();
        line.push_str(&format!(" [{}]", tags.join(", ")));
    }
    line.push_str(&format!(" ({})", e.source_ref));
    let body = e.text.trim_end();
    if !body.is_empty() && body != e.title {
        for text_line in body.lines() {
            line.push_str("\n  ");
            line.push_str(text_line);
        }
    }
    line
}
