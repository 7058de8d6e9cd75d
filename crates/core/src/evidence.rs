//! Evidence: the normalized shape every ingested record is reduced to.
//!
//! Calendar events, e-mail, tasks, chat messages, journal entries and notes
//! all share one envelope ([`Evidence`]); kind-specific fields live in the
//! closed [`EvidenceDetails`] enum so every stage can match exhaustively.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// The kind of an Evidence item.
///
/// Declaration order is the grouping order of the context document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Event,
    Task,
    Email,
    JournalEntry,
    Note,
    ChatMessage,
}

impl EvidenceKind {
    pub const ALL: [EvidenceKind; 6] = [
        EvidenceKind::Event,
        EvidenceKind::Task,
        EvidenceKind::Email,
        EvidenceKind::JournalEntry,
        EvidenceKind::Note,
        EvidenceKind::ChatMessage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Task => "task",
            Self::Email => "email",
            Self::JournalEntry => "journal_entry",
            Self::Note => "note",
            Self::ChatMessage => "chat_message",
        }
    }

    /// Structured, already-actionable kinds. Everything else is free text.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Event | Self::Task)
    }
}

impl std::fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When an Evidence item happened, in local wall-clock time.
///
/// Ranges are half-open: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Timestamp {
    Instant { at: NaiveDateTime },
    Range { start: NaiveDateTime, end: NaiveDateTime },
}

impl Timestamp {
    pub fn at(at: NaiveDateTime) -> Self {
        Self::Instant { at }
    }

    /// A range; an inverted range collapses to its start.
    pub fn range(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        if end <= start {
            Self::Instant { at: start }
        } else {
            Self::Range { start, end }
        }
    }

    /// The whole of `date`, midnight to midnight.
    pub fn full_day(date: NaiveDate) -> Self {
        Self::Range {
            start: day_start(date),
            end: day_start(date + Days::new(1)),
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        match self {
            Self::Instant { at } => *at,
            Self::Range { start, .. } => *start,
        }
    }

    pub fn end(&self) -> NaiveDateTime {
        match self {
            Self::Instant { at } => *at,
            Self::Range { end, .. } => *end,
        }
    }

    /// The calendar date this timestamp starts on.
    pub fn date(&self) -> NaiveDate {
        self.start().date()
    }

    pub fn is_full_day(&self) -> bool {
        match self {
            Self::Instant { .. } => false,
            Self::Range { start, end } => {
                start.time() == NaiveTime::MIN
                    && end.time() == NaiveTime::MIN
                    && *end > *start
            }
        }
    }

    /// Whether this timestamp falls inside the half-open window `[start, end)`.
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        match self {
            Self::Instant { at } => *at >= start && *at < end,
            Self::Range { start: s, end: e } => *s < end && *e > start,
        }
    }

    /// Gap between this timestamp and the window; zero when they overlap.
    pub fn distance_to(&self, start: NaiveDateTime, end: NaiveDateTime) -> TimeDelta {
        if self.overlaps(start, end) {
            return TimeDelta::zero();
        }
        if self.end() <= start {
            start - self.end()
        } else {
            self.start() - end
        }
    }
}

/// Midnight at the start of `date`.
pub fn day_start(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// A calendar event participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
}

impl Participant {
    /// The best human-readable label: name, then e-mail.
    pub fn label(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.email.as_deref())
    }
}

/// Kind-specific fields. The variant determines the Evidence kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvidenceDetails {
    Event {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attendees: Vec<Participant>,
        all_day: bool,
    },
    Task {
        /// 1 = highest, 4 = lowest.
        priority: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project: Option<String>,
        completed: bool,
    },
    Email {
        from: String,
        label: String,
    },
    JournalEntry {
        date: NaiveDate,
    },
    Note,
    ChatMessage {
        channel: String,
        author: String,
    },
}

impl EvidenceDetails {
    pub fn kind(&self) -> EvidenceKind {
        match self {
            Self::Event { .. } => EvidenceKind::Event,
            Self::Task { .. } => EvidenceKind::Task,
            Self::Email { .. } => EvidenceKind::Email,
            Self::JournalEntry { .. } => EvidenceKind::JournalEntry,
            Self::Note => EvidenceKind::Note,
            Self::ChatMessage { .. } => EvidenceKind::ChatMessage,
        }
    }
}

/// One normalized unit of ingested information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Stable identifier, unique within a run (source + natural key).
    pub id: String,

    /// Human-readable title (event summary, subject, note name, ...).
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,

    /// Normalized plain text; outline depth is kept as two-space indentation.
    pub text: String,

    /// Urgency/importance markers found in the text.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,

    /// Opaque pointer back to the originating raw record, for citation.
    pub source_ref: String,

    /// Alternate names this item declares for itself (notes only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases_declared: Vec<String>,

    #[serde(flatten)]
    pub details: EvidenceDetails,
}

impl Evidence {
    pub fn kind(&self) -> EvidenceKind {
        self.details.kind()
    }

    /// Open (not completed) task.
    pub fn is_open_task(&self) -> bool {
        matches!(self.details, EvidenceDetails::Task { completed: false, .. })
    }

    /// Journal date, for journal entries.
    pub fn journal_date(&self) -> Option<NaiveDate> {
        match self.details {
            EvidenceDetails::JournalEntry { date } => Some(date),
            _ => None,
        }
    }
}

/// The Evidence collection for one run.
///
/// Iteration follows insertion order. Inserting an item whose `id` is
/// already present replaces the earlier item in its original position.
#[derive(Debug, Clone, Default)]
pub struct EvidenceSet {
    items: Vec<Evidence>,
    index: HashMap<String, usize>,
}

impl EvidenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, returning the one it replaced (same `id`), if any.
    pub fn insert(&mut self, evidence: Evidence) -> Option<Evidence> {
        match self.index.get(&evidence.id) {
            Some(&pos) => Some(std::mem::replace(&mut self.items[pos], evidence)),
            None => {
                self.index.insert(evidence.id.clone(), self.items.len());
                self.items.push(evidence);
                None
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Evidence> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Evidence> {
        self.items.iter()
    }

    pub fn of_kind(&self, kind: EvidenceKind) -> impl Iterator<Item = &Evidence> {
        self.items.iter().filter(move |e| e.kind() == kind)
    }

    /// Replace text in place. `rewrite` sees each item and returns the new
    /// text, or `None` to keep it. Identity and kind are never touched.
    /// Returns the number of items whose text changed.
    pub fn rewrite_text<F>(&mut self, mut rewrite: F) -> usize
    where
        F: FnMut(&Evidence) -> Option<String>,
    {
        let mut changed = 0;
        for item in &mut self.items {
            if let Some(text) = rewrite(item) {
                if text != item.text {
                    item.text = text;
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Keep only the items `keep` accepts, preserving order. Returns how
    /// many were removed.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Evidence) -> bool,
    {
        let before = self.items.len();
        self.items.retain(|item| keep(item));
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(pos, item)| (item.id.clone(), pos))
            .collect();
        before - self.items.len()
    }

    pub fn into_vec(self) -> Vec<Evidence> {
        self.items
    }
}

impl FromIterator<Evidence> for EvidenceSet {
    fn from_iter<I: IntoIterator<Item = Evidence>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

impl<'a> IntoIterator for &'a EvidenceSet {
    type Item = &'a Evidence;
    type IntoIter = std::slice::Iter<'a, Evidence>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn note(id: &str, text: &str) -> Evidence {
        Evidence {
            id: id.into(),
            title: id.into(),
            timestamp: None,
            text: text.into(),
            tags: BTreeSet::new(),
            source_ref: format!("notes/{id}.md"),
            aliases_declared: vec![],
            details: EvidenceDetails::Note,
        }
    }

    #[test]
    fn full_day_is_a_midnight_range() {
        let ts = Timestamp::full_day(date(2025, 6, 2));
        assert!(ts.is_full_day());
        assert_eq!(ts.start(), day_start(date(2025, 6, 2)));
        assert_eq!(ts.end(), day_start(date(2025, 6, 3)));
    }

    #[test]
    fn overlap_is_half_open() {
        let day = Timestamp::full_day(date(2025, 6, 2));
        let next_midnight = day_start(date(2025, 6, 3));
        assert!(!Timestamp::at(next_midnight).overlaps(day.start(), day.end()));
        assert!(Timestamp::at(day.start()).overlaps(day.start(), day.end()));
    }

    #[test]
    fn distance_is_zero_inside_and_positive_outside() {
        let window = Timestamp::full_day(date(2025, 6, 2));
        let inside = Timestamp::at(date(2025, 6, 2).and_hms_opt(9, 0, 0).unwrap());
        let before = Timestamp::full_day(date(2025, 5, 30));
        assert_eq!(inside.distance_to(window.start(), window.end()), TimeDelta::zero());
        assert_eq!(
            before.distance_to(window.start(), window.end()),
            TimeDelta::days(2)
        );
    }

    #[test]
    fn inverted_range_collapses_to_instant() {
        let a = date(2025, 6, 2).and_hms_opt(10, 0, 0).unwrap();
        let b = date(2025, 6, 2).and_hms_opt(9, 0, 0).unwrap();
        assert_eq!(Timestamp::range(a, b), Timestamp::at(a));
    }

    #[test]
    fn duplicate_id_replaces_in_place() {
        let mut set = EvidenceSet::new();
        set.insert(note("a", "first"));
        set.insert(note("b", "other"));
        let replaced = set.insert(note("a", "second"));

        assert_eq!(replaced.unwrap().text, "first");
        assert_eq!(set.len(), 2);
        let ids: Vec<_> = set.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(set.get("a").unwrap().text, "second");
    }

    #[test]
    fn rewrite_text_counts_only_changes() {
        let mut set: EvidenceSet = vec![note("a", "x"), note("b", "y")].into_iter().collect();
        let changed = set.rewrite_text(|e| Some(if e.id == "a" { "z".into() } else { e.text.clone() }));
        assert_eq!(changed, 1);
        assert_eq!(set.get("a").unwrap().text, "z");
    }

    #[test]
    fn retain_reindexes_survivors() {
        let mut set: EvidenceSet = vec![note("a", "x"), note("b", "y"), note("c", "z")]
            .into_iter()
            .collect();
        assert_eq!(set.retain(|e| e.id != "a"), 1);
        assert!(set.get("a").is_none());
        assert_eq!(set.get("c").unwrap().text, "z");

        set.insert(note("c", "replaced"));
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("c").unwrap().text, "replaced");
    }

    #[test]
    fn evidence_serializes_kind_tag() {
        let json = serde_json::to_string(&note("a", "body")).unwrap();
        assert!(json.contains(r#""kind":"note""#));
    }
}
