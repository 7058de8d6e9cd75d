//! Directive extraction from today's journal.
//!
//! Purely lexical: a line is a directive when, after its list marker, it
//! starts with the trigger (bare, `[[trigger]]`, or `[[canonical]]` when
//! the alias graph renamed the trigger note) followed by whitespace and
//! some text.

use chrono::NaiveDate;
use tracing::debug;
use vea_core::{Directive, EvidenceKind, EvidenceSet};

use crate::alias::AliasGraph;
use crate::text;

/// Recognizes trigger-token lines.
#[derive(Debug, Clone)]
pub struct TriggerMatcher {
    /// Lowercased accepted spellings, longest first.
    forms: Vec<String>,
}

impl TriggerMatcher {
    pub fn new(trigger: &str, aliases: &AliasGraph) -> Self {
        let trigger = trigger.trim();
        let mut forms = vec![
            trigger.to_lowercase(),
            format!("[[{}]]", trigger.to_lowercase()),
        ];
        if let Some(canonical) = aliases.canonical(trigger) {
            let form = format!("[[{}]]", canonical.to_lowercase());
            if !forms.contains(&form) {
                forms.push(form);
            }
        }
        forms.sort_by_key(|f| std::cmp::Reverse(f.len()));
        Self { forms }
    }

    /// Length of the trigger form `content` starts with, if any.
    fn prefix_len(&self, content: &str) -> Option<usize> {
        self.forms.iter().find_map(|form| {
            let head = content.get(..form.len())?;
            (head.to_lowercase() == *form).then_some(form.len())
        })
    }

    /// The instruction text of a directive line, if `line` is one.
    pub fn instruction<'a>(&self, line: &'a str) -> Option<&'a str> {
        let content = text::strip_list_marker(line);
        let rest = &content[self.prefix_len(content)?..];
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let rest = rest.trim();
        (!rest.is_empty()).then_some(rest)
    }

    /// Whether `line` starts with the trigger at all, with or without an
    /// instruction after it.
    pub fn mentions(&self, line: &str) -> bool {
        let content = text::strip_list_marker(line);
        match self.prefix_len(content) {
            Some(len) => content[len..].chars().next().is_none_or(char::is_whitespace),
            None => false,
        }
    }
}

/// Extract the directives of `today`'s journal, top to bottom.
///
/// Journals of any other date are ignored. No journal for today means no
/// directives.
pub fn extract(evidence: &EvidenceSet, today: NaiveDate, matcher: &TriggerMatcher) -> Vec<Directive> {
    let mut directives = Vec::new();
    for entry in evidence
        .of_kind(EvidenceKind::JournalEntry)
        .filter(|e| e.journal_date() == Some(today))
    {
        for (idx, line) in entry.text.lines().enumerate() {
            if let Some(instruction) = matcher.instruction(line) {
                directives.push(Directive {
                    order: directives.len(),
                    raw_text: instruction.to_string(),
                    source_id: entry.id.clone(),
                    line: idx + 1,
                    depth: text::depth_of(line),
                });
            }
        }
    }
    debug!(count = directives.len(), %today, "Directives extracted");
    directives
}

/// Remove trigger lines from journals dated other than `today`, so stale
/// instructions never reach the summarizer. Returns the number of journal
/// entries changed.
pub fn strip_stale(evidence: &mut EvidenceSet, today: NaiveDate, matcher: &TriggerMatcher) -> usize {
    let changed = evidence.rewrite_text(|item| {
        let date = item.journal_date()?;
        if date == today || !item.text.lines().any(|l| matcher.mentions(l)) {
            return None;
        }
        Some(
            item.text
                .lines()
                .filter(|l| !matcher.mentions(l))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    });
    if changed > 0 {
        debug!(changed, "Stale directive lines stripped");
    }
    changed
}
