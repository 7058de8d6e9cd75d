//! Normalizer: raw provider records in, Evidence out.
//!
//! Every raw record maps to exactly one Evidence item or one
//! `MalformedRecord` error. The normalizer is pure: no I/O, no shared
//! state, so batches can be normalized on separate threads.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use tracing::debug;
use vea_core::evidence::day_start;
use vea_core::raw::{RawChatMessage, RawEmail, RawEvent, RawJournal, RawNote, RawTask};
use vea_core::{
    Evidence, EvidenceDetails, NormalizeError, Participant, RawRecord, SourceBatch, Timestamp,
};

use crate::text;

/// Address suffix of calendar resources (rooms, equipment).
const RESOURCE_CALENDAR_DOMAIN: &str = "@resource.calendar.google.com";

/// Settings the normalizer needs; passed in explicitly per pipeline.
#[derive(Debug, Clone)]
pub struct NormalizerSettings {
    /// Zone provider timestamps are converted into.
    pub tz: Tz,
    /// Marker vocabulary.
    pub markers: Vec<String>,
    /// Maximum e-mail body length in characters.
    pub email_body_limit: usize,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            tz: chrono_tz::Europe::Amsterdam,
            markers: ["urgent", "important", "asap", "deadline", "blocked", "todo", "waiting"]
                .into_iter()
                .map(String::from)
                .collect(),
            email_body_limit: 2000,
        }
    }
}

/// Result of normalizing one source batch.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub evidence: Vec<Evidence>,
    pub rejected: Vec<NormalizeError>,
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    settings: NormalizerSettings,
}

impl Normalizer {
    pub fn new(mut settings: NormalizerSettings) -> Self {
        settings.markers = settings
            .markers
            .iter()
            .map(|m| m.trim().trim_start_matches('#').to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        Self { settings }
    }

    /// Normalize every record of a batch, in order. Malformed records are
    /// collected after the ones the loader already rejected, never fatal.
    pub fn normalize_batch(&self, batch: &SourceBatch) -> NormalizedBatch {
        let mut out = NormalizedBatch {
            evidence: Vec::new(),
            rejected: batch.rejected.clone(),
        };
        for record in &batch.records {
            match self.normalize(record) {
                Ok(evidence) => out.evidence.push(evidence),
                Err(e) => out.rejected.push(e),
            }
        }
        debug!(
            source = %batch.source,
            normalized = out.evidence.len(),
            rejected = out.rejected.len(),
            "Normalized source batch"
        );
        out
    }

    /// Normalize one raw record.
    pub fn normalize(&self, record: &RawRecord) -> Result<Evidence, NormalizeError> {
        let source_ref = record.source_ref();
        match record {
            RawRecord::Event(raw) => self.event(raw, source_ref),
            RawRecord::Email(raw) => self.email(raw, source_ref),
            RawRecord::Task(raw) => self.task(raw, source_ref),
            RawRecord::ChatMessage(raw) => self.chat(raw, source_ref),
            RawRecord::Journal(raw) => self.journal(raw, source_ref),
            RawRecord::Note(raw) => self.note(raw, source_ref),
        }
    }

    fn event(&self, raw: &RawEvent, source_ref: String) -> Result<Evidence, NormalizeError> {
        let start_raw = non_empty(raw.start.as_deref())
            .ok_or_else(|| NormalizeError::malformed(&source_ref, "event has no start"))?;
        let end_raw = non_empty(raw.end.as_deref());

        let (timestamp, all_day) = match parse_date(start_raw) {
            Some(day) => {
                let end_day = match end_raw {
                    Some(e) => Some(parse_date(e).ok_or_else(|| {
                        NormalizeError::malformed(&source_ref, format!("unparseable end '{e}'"))
                    })?),
                    None => None,
                };
                let ts = match end_day {
                    Some(end) if end > day => Timestamp::range(day_start(day), day_start(end)),
                    _ => Timestamp::full_day(day),
                };
                (ts, true)
            }
            None => {
                let start = self.parse_instant(start_raw).ok_or_else(|| {
                    NormalizeError::malformed(&source_ref, format!("unparseable start '{start_raw}'"))
                })?;
                let ts = match end_raw {
                    Some(e) => {
                        let end = self.parse_instant(e).ok_or_else(|| {
                            NormalizeError::malformed(&source_ref, format!("unparseable end '{e}'"))
                        })?;
                        Timestamp::range(start, end)
                    }
                    None => Timestamp::at(start),
                };
                (ts, false)
            }
        };

        let title = match raw.summary.trim() {
            "" => "(untitled event)".to_string(),
            s => s.to_string(),
        };
        let description = text::MEET_BLOCK.replace_all(&raw.description, "");
        let description =
            text::collapse_blank_lines(&text::normalize_outline(&text::strip_zero_width(&description)));

        let id = match non_empty(raw.event_id.as_deref()) {
            Some(event_id) => format!("event:{}:{}", raw.calendar_id, event_id),
            None => format!("event:{}:{}:{}", raw.calendar_id, start_raw, title),
        };

        // Rooms and other bookable resources are not people.
        let attendees = raw
            .attendees
            .iter()
            .filter(|a| {
                !a.email
                    .as_deref()
                    .is_some_and(|e| e.ends_with(RESOURCE_CALENDAR_DOMAIN))
            })
            .map(|a| Participant {
                name: a.name.clone(),
                email: a.email.clone(),
                response_status: a.response_status.clone(),
            })
            .collect();

        Ok(Evidence {
            id,
            tags: self.markers(&[title.as_str(), description.as_str()]),
            title,
            timestamp: Some(timestamp),
            text: description,
            source_ref,
            aliases_declared: vec![],
            details: EvidenceDetails::Event {
                location: non_empty(raw.location.as_deref()).map(String::from),
                attendees,
                all_day,
            },
        })
    }

    fn email(&self, raw: &RawEmail, source_ref: String) -> Result<Evidence, NormalizeError> {
        if raw.message_id.trim().is_empty() {
            return Err(NormalizeError::malformed(source_ref, "email has no message id"));
        }
        let date_raw = non_empty(raw.date.as_deref())
            .ok_or_else(|| NormalizeError::malformed(&source_ref, "missing Date header"))?;
        let at = self.parse_instant(date_raw).ok_or_else(|| {
            NormalizeError::malformed(&source_ref, format!("unparseable Date header '{date_raw}'"))
        })?;

        let title = match raw.subject.trim() {
            "" => "(no subject)".to_string(),
            s => text::strip_zero_width(s).trim().to_string(),
        };
        let body = clean_email_body(&raw.body, self.settings.email_body_limit);

        Ok(Evidence {
            id: format!("email:{}", raw.message_id.trim()),
            tags: self.markers(&[title.as_str(), body.as_str()]),
            title,
            timestamp: Some(Timestamp::at(at)),
            text: body,
            source_ref,
            aliases_declared: vec![],
            details: EvidenceDetails::Email {
                from: raw.from.trim().to_string(),
                label: raw.label.clone(),
            },
        })
    }

    fn task(&self, raw: &RawTask, source_ref: String) -> Result<Evidence, NormalizeError> {
        if raw.task_id.trim().is_empty() {
            return Err(NormalizeError::malformed(source_ref, "task has no id"));
        }
        let title = raw.content.trim();
        if title.is_empty() {
            return Err(NormalizeError::malformed(source_ref, "task has no content"));
        }

        let completed = non_empty(raw.completed_at.as_deref());
        let timestamp = match (completed, non_empty(raw.due.as_deref())) {
            (Some(done), _) => Some(Timestamp::at(self.parse_instant(done).ok_or_else(|| {
                NormalizeError::malformed(&source_ref, format!("unparseable completion time '{done}'"))
            })?)),
            (None, Some(due)) => match parse_date(due) {
                Some(day) => Some(Timestamp::full_day(day)),
                None => Some(Timestamp::at(self.parse_instant(due).ok_or_else(|| {
                    NormalizeError::malformed(&source_ref, format!("unparseable due date '{due}'"))
                })?)),
            },
            (None, None) => None,
        };

        let description = text::normalize_outline(&raw.description);
        let body = if description.is_empty() {
            title.to_string()
        } else {
            format!("{title}\n{description}")
        };

        let priority = raw.priority.clamp(1, 4);
        let mut tags = self.markers(&[body.as_str()]);
        if priority == 1 {
            tags.insert("p1".to_string());
        }

        Ok(Evidence {
            id: format!("task:{}", raw.task_id.trim()),
            title: title.to_string(),
            timestamp,
            text: body,
            tags,
            source_ref,
            aliases_declared: vec![],
            details: EvidenceDetails::Task {
                priority,
                project: non_empty(raw.project.as_deref()).map(String::from),
                completed: completed.is_some(),
            },
        })
    }

    fn chat(&self, raw: &RawChatMessage, source_ref: String) -> Result<Evidence, NormalizeError> {
        let ts = non_empty(raw.ts.as_deref())
            .ok_or_else(|| NormalizeError::malformed(&source_ref, "message has no ts"))?;
        let at = parse_slack_ts(ts, self.settings.tz).ok_or_else(|| {
            NormalizeError::malformed(&source_ref, format!("unparseable ts '{ts}'"))
        })?;

        let mut body = clean_slack_text(&raw.text);
        for reply in &raw.replies {
            let reply_text = clean_slack_text(&reply.text);
            if reply_text.is_empty() {
                continue;
            }
            let who = if reply.user.trim().is_empty() {
                "unknown"
            } else {
                reply.user.trim()
            };
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(&format!("  - {who}: {reply_text}"));
        }
        if body.trim().is_empty() {
            return Err(NormalizeError::malformed(source_ref, "empty message"));
        }

        let author = match raw.user.trim() {
            "" => "unknown".to_string(),
            u => u.to_string(),
        };

        Ok(Evidence {
            id: format!("chat:{}:{}", raw.channel, ts),
            title: format!("{author} in #{}", raw.channel),
            timestamp: Some(Timestamp::at(at)),
            tags: self.markers(&[body.as_str()]),
            text: body,
            source_ref,
            aliases_declared: vec![],
            details: EvidenceDetails::ChatMessage {
                channel: raw.channel.clone(),
                author,
            },
        })
    }

    fn journal(&self, raw: &RawJournal, source_ref: String) -> Result<Evidence, NormalizeError> {
        let stem = raw.filename.trim();
        let date = NaiveDate::parse_from_str(stem, "%Y_%m_%d")
            .or_else(|_| NaiveDate::parse_from_str(stem, "%Y-%m-%d"))
            .map_err(|_| {
                NormalizeError::malformed(&source_ref, format!("'{stem}' is not a journal date"))
            })?;
        if is_trivial(&raw.content) {
            return Err(NormalizeError::malformed(source_ref, "empty journal page"));
        }
        let body = text::normalize_outline(&raw.content);

        Ok(Evidence {
            id: format!("journal:{date}"),
            title: date.format("%Y-%m-%d").to_string(),
            timestamp: Some(Timestamp::full_day(date)),
            tags: self.markers(&[body.as_str()]),
            text: body,
            source_ref,
            aliases_declared: vec![],
            details: EvidenceDetails::JournalEntry { date },
        })
    }

    fn note(&self, raw: &RawNote, source_ref: String) -> Result<Evidence, NormalizeError> {
        let name = raw.filename.trim();
        if name.is_empty() {
            return Err(NormalizeError::malformed(source_ref, "note has no name"));
        }
        if is_trivial(&raw.content) {
            return Err(NormalizeError::malformed(source_ref, "note has no content"));
        }

        let mut aliases: Vec<String> = Vec::new();
        let mut body_lines: Vec<&str> = Vec::new();
        for line in raw.content.lines() {
            match alias_values(line) {
                Some(values) => {
                    for value in values {
                        if !aliases.contains(&value) {
                            aliases.push(value);
                        }
                    }
                }
                None => body_lines.push(line),
            }
        }
        let body = text::normalize_outline(&body_lines.join("\n"));

        Ok(Evidence {
            id: format!("note:{name}"),
            title: name.to_string(),
            timestamp: None,
            tags: self.markers(&[body.as_str()]),
            text: body,
            source_ref,
            aliases_declared: aliases,
            details: EvidenceDetails::Note,
        })
    }

    fn markers(&self, parts: &[&str]) -> BTreeSet<String> {
        parts
            .iter()
            .flat_map(|p| text::collect_markers(p, &self.settings.markers))
            .collect()
    }

    /// RFC 3339, RFC 2822, or a naive local date-time.
    fn parse_instant(&self, value: &str) -> Option<NaiveDateTime> {
        let value = value.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.with_timezone(&self.settings.tz).naive_local());
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
            return Some(dt.with_timezone(&self.settings.tz).naive_local());
        }
        ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Slack `ts`: epoch seconds with an optional fraction, `1717315200.000100`.
fn parse_slack_ts(ts: &str, tz: Tz) -> Option<NaiveDateTime> {
    let ts = ts.trim();
    let (secs, frac) = ts.split_once('.').unwrap_or((ts, ""));
    let secs: i64 = secs.parse().ok()?;
    let micros: u32 = if frac.is_empty() {
        0
    } else {
        if !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        frac.chars()
            .chain(std::iter::repeat('0'))
            .take(6)
            .collect::<String>()
            .parse()
            .ok()?
    };
    let utc = DateTime::from_timestamp(secs, micros * 1000)?;
    Some(utc.with_timezone(&tz).naive_local())
}

/// Pages with nothing a reader would want: empty, a lone bullet, or
/// Logseq bookkeeping.
fn is_trivial(content: &str) -> bool {
    let trimmed = content.trim();
    trimmed.is_empty()
        || trimmed == "-"
        || trimmed == "exclude-from-graph-view:: true"
        || trimmed.starts_with("file::")
}

/// Values of an `alias::` / `aliases::` property line.
fn alias_values(line: &str) -> Option<Vec<String>> {
    let content = text::strip_list_marker(line);
    let (key, values) = content.split_once("::")?;
    let key = key.trim().to_ascii_lowercase();
    if key != "alias" && key != "aliases" {
        return None;
    }
    Some(
        values
            .split(',')
            .map(text::unwrap_link)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect(),
    )
}

/// Drop quoted history and the reply attribution, fold invisible
/// characters, collapse blank runs, truncate.
fn clean_email_body(body: &str, limit: usize) -> String {
    let body = text::strip_zero_width(body);
    let kept: Vec<&str> = body
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with('>') && !text::REPLY_ATTRIBUTION.is_match(trimmed)
        })
        .collect();
    text::truncate_chars(&text::collapse_blank_lines(&kept.join("\n")), limit)
}

/// Replace Slack mention markup with readable names.
fn clean_slack_text(raw: &str) -> String {
    let t = text::SLACK_SUBTEAM.replace_all(raw, "@$1");
    let t = text::SLACK_CHANNEL.replace_all(&t, "#$1");
    let t = text::SLACK_USER.replace_all(&t, |caps: &regex_lite::Captures<'_>| {
        let name = caps.get(2).or_else(|| caps.get(1)).map_or("", |m| m.as_str());
        format!("@{name}")
    });
    let t = text::SLACK_SPECIAL.replace_all(&t, "@$1");
    text::strip_zero_width(&t).trim().to_string()
}
