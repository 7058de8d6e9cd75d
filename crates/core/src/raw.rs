//! Raw records: the output contract of source loaders.
//!
//! Each provider hands the core one of these per record. Field values are
//! passed through as the provider spelled them (timestamps as strings);
//! the normalizer decides whether a record is usable.

use serde::{Deserialize, Serialize};

/// One raw record, tagged by its declared kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawRecord {
    Event(RawEvent),
    Email(RawEmail),
    Task(RawTask),
    ChatMessage(RawChatMessage),
    Journal(RawJournal),
    Note(RawNote),
}

impl RawRecord {
    /// A short reference back to the record, used in warnings and citations.
    pub fn source_ref(&self) -> String {
        match self {
            Self::Event(e) => format!(
                "calendar:{}/{}",
                e.calendar_id,
                e.event_id.as_deref().unwrap_or(&e.summary)
            ),
            Self::Email(m) => format!("gmail:{}/{}", m.label, m.message_id),
            Self::Task(t) => format!("todoist:{}", t.task_id),
            Self::ChatMessage(c) => {
                format!("slack:{}/{}", c.channel, c.ts.as_deref().unwrap_or("?"))
            }
            Self::Journal(j) => format!("journals/{}.md", j.filename),
            Self::Note(n) => format!("notes/{}.md", n.filename),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAttendee {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub response_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default = "default_calendar")]
    pub calendar_id: String,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    /// RFC 3339 date-time, or `YYYY-MM-DD` for all-day events.
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub attendees: Vec<RawAttendee>,
}

fn default_calendar() -> String {
    "primary".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEmail {
    pub message_id: String,
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub from: String,
    /// The `Date` header (RFC 2822) or an RFC 3339 timestamp.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub body: String,
}

fn default_label() -> String {
    "inbox".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTask {
    pub task_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub description: String,
    /// `YYYY-MM-DD` or an RFC 3339 date-time.
    #[serde(default)]
    pub due: Option<String>,
    /// 1 = highest, 4 = lowest.
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

fn default_priority() -> u8 {
    4
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReply {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChatMessage {
    pub channel: String,
    /// Slack-style epoch seconds with fraction, e.g. `1717315200.000100`.
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub replies: Vec<RawReply>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawJournal {
    /// File stem, e.g. `2025_06_02`.
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNote {
    /// File stem; doubles as the note's canonical name.
    pub filename: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_record_parses_tagged_json() {
        let line = r#"{"kind":"email","message_id":"m1","subject":"Hi","from":"a@b.c","date":"Mon, 2 Jun 2025 09:00:00 +0200","body":"hello"}"#;
        let record: RawRecord = serde_json::from_str(line).unwrap();
        match &record {
            RawRecord::Email(m) => {
                assert_eq!(m.label, "inbox");
                assert_eq!(m.subject, "Hi");
            }
            other => panic!("expected email, got {other:?}"),
        }
        assert_eq!(record.source_ref(), "gmail:inbox/m1");
    }

    #[test]
    fn task_priority_defaults_to_lowest() {
        let record: RawRecord =
            serde_json::from_str(r#"{"kind":"task","task_id":"t1","content":"Ship it"}"#).unwrap();
        let RawRecord::Task(task) = record else {
            panic!("expected task");
        };
        assert_eq!(task.priority, 4);
        assert!(task.due.is_none());
    }
}
