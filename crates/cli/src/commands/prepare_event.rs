//! `vea prepare-event`: Preparation notes for a calendar event.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use vea_core::{EventSelector, EventTarget, TaskContext};

use super::brief;
use crate::SourceArgs;

pub async fn run(
    config_path: Option<&Path>,
    event: &str,
    lookahead_minutes: i64,
    sources: &SourceArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = brief::load_config(config_path, sources)?;
    let now = brief::local_now(&config)?;
    let selector = parse_selector(event, now, lookahead_minutes)?;

    let today = now.date();
    let task = TaskContext::prepare_event(today, EventTarget::Select(selector));
    brief::execute(&config, task, today, sources).await
}

/// `next`, `now`, `YYYY-MM-DD HH:MM` or `HH:MM` (today).
pub fn parse_selector(
    input: &str,
    now: NaiveDateTime,
    lookahead_minutes: i64,
) -> Result<EventSelector, String> {
    let input = input.trim();
    match input.to_ascii_lowercase().as_str() {
        "next" => {
            return Ok(EventSelector::Next {
                after: now,
                lookahead_minutes,
            });
        }
        "now" | "current" => return Ok(EventSelector::Current { at: now }),
        _ => {}
    }

    if let Ok(at) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        return Ok(EventSelector::StartingAt { at });
    }
    if let Ok(time) = NaiveTime::parse_from_str(input, "%H:%M") {
        return Ok(EventSelector::StartingAt {
            at: now.date().and_time(time),
        });
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Err(format!(
            "'{date}' has no time; use \"{date} HH:MM\" to pick an event"
        ));
    }
    Err(format!(
        "invalid --event '{input}': expected next, now, \"YYYY-MM-DD HH:MM\" or HH:MM"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap()
    }

    #[test]
    fn keywords() {
        assert_eq!(
            parse_selector("Next", now(), 60).unwrap(),
            EventSelector::Next {
                after: now(),
                lookahead_minutes: 60
            }
        );
        assert_eq!(
            parse_selector("now", now(), 60).unwrap(),
            EventSelector::Current { at: now() }
        );
    }

    #[test]
    fn explicit_start_times() {
        let full = parse_selector("2025-06-03 14:00", now(), 60).unwrap();
        let EventSelector::StartingAt { at } = full else {
            panic!("expected StartingAt");
        };
        assert_eq!(at.to_string(), "2025-06-03 14:00:00");

        let short = parse_selector("14:30", now(), 60).unwrap();
        let EventSelector::StartingAt { at } = short else {
            panic!("expected StartingAt");
        };
        assert_eq!(at.to_string(), "2025-06-02 14:30:00");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_selector("tomorrow-ish", now(), 60).is_err());
        assert!(parse_selector("2025-06-03", now(), 60)
            .unwrap_err()
            .contains("has no time"));
    }
}
