//! Task context: what a run is preparing for, and how much it may keep.
//!
//! The context is passed explicitly into every stage; nothing here is
//! global, so concurrent runs never share state.

use crate::error::AssemblyError;
use crate::evidence::{EvidenceKind, day_start};
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

/// Everything the pipeline needs to know about the run's task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContext {
    /// The run's "today". Directives are only read from this date's journal.
    pub today: NaiveDate,
    pub descriptor: TaskDescriptor,
    /// Replaces the focus terms the ranker would derive when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_terms: Option<Vec<String>>,
}

impl TaskContext {
    pub fn daily(today: NaiveDate) -> Self {
        Self {
            today,
            descriptor: TaskDescriptor::Daily,
            focus_terms: None,
        }
    }

    pub fn weekly(today: NaiveDate, week: WeekSpan) -> Self {
        Self {
            today,
            descriptor: TaskDescriptor::Weekly(week),
            focus_terms: None,
        }
    }

    pub fn prepare_event(today: NaiveDate, target: EventTarget) -> Self {
        Self {
            today,
            descriptor: TaskDescriptor::PrepareEvent(target),
            focus_terms: None,
        }
    }

    pub fn with_focus_terms(mut self, terms: Vec<String>) -> Self {
        self.focus_terms = Some(terms);
        self
    }

    /// The half-open relevance window `[start, end)`.
    ///
    /// Fails with `IncompleteContext` when the descriptor cannot yield one.
    pub fn window(&self) -> Result<(NaiveDateTime, NaiveDateTime), AssemblyError> {
        match &self.descriptor {
            TaskDescriptor::Daily => Ok((
                day_start(self.today),
                day_start(self.today + Days::new(1)),
            )),
            TaskDescriptor::Weekly(week) => {
                if week.end < week.start {
                    return Err(AssemblyError::incomplete(format!(
                        "week ends ({}) before it starts ({})",
                        week.end, week.start
                    )));
                }
                Ok((day_start(week.start), day_start(week.end + Days::new(1))))
            }
            TaskDescriptor::PrepareEvent(EventTarget::Window(event)) => {
                if event.end < event.start {
                    return Err(AssemblyError::incomplete(format!(
                        "event '{}' ends before it starts",
                        event.title
                    )));
                }
                Ok((event.start, event.end))
            }
            TaskDescriptor::PrepareEvent(EventTarget::Select(selector)) => Err(
                AssemblyError::incomplete(format!("event selector {selector} was never resolved")),
            ),
            TaskDescriptor::PrepareEvent(EventTarget::Unresolved { reason }) => {
                Err(AssemblyError::incomplete(reason.clone()))
            }
        }
    }

    /// The event being prepared for, when there is one.
    pub fn event(&self) -> Option<&EventWindow> {
        match &self.descriptor {
            TaskDescriptor::PrepareEvent(EventTarget::Window(event)) => Some(event),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskDescriptor {
    /// Brief for `today`.
    Daily,
    /// Review of an ISO week.
    Weekly(WeekSpan),
    /// Preparation for one meeting.
    PrepareEvent(EventTarget),
}

/// How a prepare-event run names its event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum EventTarget {
    /// A fully specified event window.
    Window(EventWindow),
    /// Pick an event from the loaded calendar Evidence.
    Select(EventSelector),
    /// Selection ran and found nothing.
    Unresolved { reason: String },
}

/// The meeting a prepare-event run is scored against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(default)]
    pub participants: Vec<String>,
    /// Evidence id of the calendar event, when resolved from one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

/// Which calendar event to prepare for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "select", rename_all = "snake_case")]
pub enum EventSelector {
    /// Earliest timed event starting at or after `after`, within the lookahead.
    Next {
        after: NaiveDateTime,
        lookahead_minutes: i64,
    },
    /// An event in progress at `at`.
    Current { at: NaiveDateTime },
    /// The timed event starting exactly at `at`.
    StartingAt { at: NaiveDateTime },
}

impl std::fmt::Display for EventSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Next {
                after,
                lookahead_minutes,
            } => write!(
                f,
                "next event after {} (lookahead {}m)",
                after.format("%Y-%m-%d %H:%M"),
                lookahead_minutes
            ),
            Self::Current { at } => write!(f, "event in progress at {}", at.format("%Y-%m-%d %H:%M")),
            Self::StartingAt { at } => write!(f, "event starting at {}", at.format("%Y-%m-%d %H:%M")),
        }
    }
}

/// An ISO week, Monday through Sunday inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekSpan {
    /// The ISO week containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let start = date - Days::new(u64::from(date.weekday().num_days_from_monday()));
        Self {
            start,
            end: start + Days::new(6),
        }
    }

    /// Parse `2025-W22`, `2025-22`, `22` (ISO year of `today`) or a
    /// `YYYY-MM-DD` date inside the week.
    pub fn parse(input: &str, today: NaiveDate) -> Result<Self, AssemblyError> {
        let trimmed = input.trim();
        let invalid = || AssemblyError::incomplete(format!("invalid week: '{trimmed}'"));

        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(Self::containing(date));
        }

        let (year, week) = match trimmed.split_once('-') {
            Some((year, week)) => {
                let week = week.trim_start_matches(['W', 'w']);
                (
                    year.parse::<i32>().map_err(|_| invalid())?,
                    week.parse::<u32>().map_err(|_| invalid())?,
                )
            }
            None => (
                today.iso_week().year(),
                trimmed
                    .trim_start_matches(['W', 'w'])
                    .parse::<u32>()
                    .map_err(|_| invalid())?,
            ),
        };

        let start = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).ok_or_else(invalid)?;
        Ok(Self {
            start,
            end: start + Days::new(6),
        })
    }

    /// `2025-W22`.
    pub fn label(&self) -> String {
        let iso = self.start.iso_week();
        format!("{}-W{:02}", iso.year(), iso.week())
    }
}

/// How much Evidence a run may keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Budget {
    /// Score, sort and truncate each kind to its cap.
    Ranked(KindCaps),
    /// Full-context mode: keep everything, chronologically.
    Unbounded,
}

impl Budget {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }
}

/// Which items share a token ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetScope {
    /// One ceiling for every kind together.
    #[default]
    Global,
    /// The full ceiling for each kind separately.
    Group,
}

/// Maximum item count per kind, plus an optional token ceiling applied
/// after the counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCaps {
    #[serde(default = "default_events")]
    pub events: usize,
    #[serde(default = "default_tasks")]
    pub tasks: usize,
    #[serde(default = "default_emails")]
    pub emails: usize,
    #[serde(default = "default_journal")]
    pub journal: usize,
    #[serde(default = "default_notes")]
    pub notes: usize,
    #[serde(default = "default_chat")]
    pub chat: usize,
    /// Estimated tokens the kept items outside the floor may use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<usize>,
    #[serde(default)]
    pub token_scope: BudgetScope,
}

fn default_events() -> usize {
    50
}
fn default_tasks() -> usize {
    50
}
fn default_emails() -> usize {
    20
}
fn default_journal() -> usize {
    14
}
fn default_notes() -> usize {
    10
}
fn default_chat() -> usize {
    40
}

impl KindCaps {
    pub fn cap_for(&self, kind: EvidenceKind) -> usize {
        match kind {
            EvidenceKind::Event => self.events,
            EvidenceKind::Task => self.tasks,
            EvidenceKind::Email => self.emails,
            EvidenceKind::JournalEntry => self.journal,
            EvidenceKind::Note => self.notes,
            EvidenceKind::ChatMessage => self.chat,
        }
    }

    /// Same cap for every kind.
    pub fn uniform(cap: usize) -> Self {
        Self {
            events: cap,
            tasks: cap,
            emails: cap,
            journal: cap,
            notes: cap,
            chat: cap,
            tokens: None,
            token_scope: BudgetScope::default(),
        }
    }
}

impl Default for KindCaps {
    fn default() -> Self {
        Self {
            events: default_events(),
            tasks: default_tasks(),
            emails: default_emails(),
            journal: default_journal(),
            notes: default_notes(),
            chat: default_chat(),
            tokens: None,
            token_scope: BudgetScope::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_week_with_w() {
        let week = WeekSpan::parse("2025-W22", date(2025, 1, 1)).unwrap();
        assert_eq!(week.start, date(2025, 5, 26));
        assert_eq!(week.end, date(2025, 6, 1));
        assert_eq!(week.label(), "2025-W22");
    }

    #[test]
    fn parse_week_without_w() {
        let week = WeekSpan::parse("2025-22", date(2024, 1, 1)).unwrap();
        assert_eq!(week.start, date(2025, 5, 26));
    }

    #[test]
    fn parse_week_number_only_uses_today_year() {
        let week = WeekSpan::parse("22", date(2025, 7, 4)).unwrap();
        assert_eq!(week.start, date(2025, 5, 26));
    }

    #[test]
    fn parse_week_from_date() {
        let week = WeekSpan::parse("2025-05-28", date(2020, 1, 1)).unwrap();
        assert_eq!(week.start, date(2025, 5, 26));
        assert_eq!(week.end, date(2025, 6, 1));
    }

    #[test]
    fn parse_week_rejects_garbage() {
        assert!(WeekSpan::parse("next tuesday", date(2025, 1, 1)).is_err());
        assert!(WeekSpan::parse("2025-W60", date(2025, 1, 1)).is_err());
    }

    #[test]
    fn daily_window_is_one_day() {
        let ctx = TaskContext::daily(date(2025, 6, 2));
        let (start, end) = ctx.window().unwrap();
        assert_eq!(end - start, TimeDelta::days(1));
    }

    #[test]
    fn unresolved_event_is_incomplete() {
        let ctx = TaskContext::prepare_event(
            date(2025, 6, 2),
            EventTarget::Unresolved {
                reason: "no upcoming events found".into(),
            },
        );
        let err = ctx.window().unwrap_err();
        assert!(err.to_string().contains("no upcoming events"));
    }

    #[test]
    fn caps_lookup_by_kind() {
        let caps = KindCaps {
            events: 1,
            ..KindCaps::default()
        };
        assert_eq!(caps.cap_for(EvidenceKind::Event), 1);
        assert_eq!(caps.cap_for(EvidenceKind::Email), 20);
    }

    #[test]
    fn token_ceiling_defaults_to_none_and_global() {
        let caps: KindCaps = serde_json::from_str(r#"{"events": 3}"#).unwrap();
        assert_eq!(caps.tokens, None);
        assert_eq!(caps.token_scope, BudgetScope::Global);

        let caps: KindCaps =
            serde_json::from_str(r#"{"tokens": 500, "token_scope": "group"}"#).unwrap();
        assert_eq!(caps.tokens, Some(500));
        assert_eq!(caps.token_scope, BudgetScope::Group);
    }

    #[test]
    fn focus_override_is_kept_on_the_context() {
        let ctx = TaskContext::daily(date(2025, 6, 2)).with_focus_terms(vec!["budget".into()]);
        assert_eq!(ctx.focus_terms.as_deref(), Some(&["budget".to_string()][..]));
    }
}
