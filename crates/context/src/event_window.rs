//! Event resolution for prepare-event runs.
//!
//! A selector ("next", "now", "starting at 14:00") is turned into a concrete
//! [`EventWindow`] by looking at the normalized calendar Evidence. When no
//! event qualifies the target becomes `Unresolved`, which the task context
//! reports as `IncompleteContext`.

use chrono::{NaiveDateTime, TimeDelta};
use tracing::{debug, info};
use vea_core::{
    Evidence, EvidenceDetails, EvidenceKind, EvidenceSet, EventSelector, EventTarget, EventWindow,
    TaskContext, TaskDescriptor,
};

/// Default lookahead for `Next` selectors: one week.
pub const DEFAULT_LOOKAHEAD_MINUTES: i64 = 7 * 24 * 60;

/// Length assumed for a timed event that has a start but no end.
pub const DEFAULT_EVENT_MINUTES: i64 = 30;

/// Replace a `Select` target with the event it picks. Other task contexts
/// are returned unchanged.
pub fn resolve_task(task: TaskContext, evidence: &EvidenceSet) -> TaskContext {
    match task.descriptor {
        TaskDescriptor::PrepareEvent(EventTarget::Select(selector)) => {
            let target = match select(&selector, evidence) {
                Some(event) => {
                    info!(event = %event.title, start = %event.start, "Resolved event");
                    EventTarget::Window(event)
                }
                None => {
                    debug!(%selector, "No event matched selector");
                    EventTarget::Unresolved {
                        reason: format!("no calendar event matches: {selector}"),
                    }
                }
            };
            TaskContext {
                descriptor: TaskDescriptor::PrepareEvent(target),
                ..task
            }
        }
        descriptor => TaskContext { descriptor, ..task },
    }
}

/// Pick the event a selector names. Ties go to the first in Evidence order.
pub fn select(selector: &EventSelector, evidence: &EvidenceSet) -> Option<EventWindow> {
    let mut timed = evidence.of_kind(EvidenceKind::Event).filter(|e| is_timed(e));
    let chosen = match selector {
        EventSelector::Next {
            after,
            lookahead_minutes,
        } => {
            let horizon = *after + TimeDelta::minutes(*lookahead_minutes);
            timed
                .filter(|e| start_of(e).is_some_and(|s| s >= *after && s <= horizon))
                .min_by_key(|e| start_of(e))
        }
        EventSelector::Current { at } => {
            timed.find(|e| span_of(e).is_some_and(|(start, end)| start <= *at && *at < end))
        }
        EventSelector::StartingAt { at } => timed.find(|e| start_of(e) == Some(*at)),
    }?;
    window_of(chosen)
}

/// Timed (not all-day) calendar events only.
fn is_timed(evidence: &Evidence) -> bool {
    match (&evidence.details, evidence.timestamp) {
        (EvidenceDetails::Event { all_day, .. }, Some(ts)) => !*all_day && !ts.is_full_day(),
        _ => false,
    }
}

fn start_of(evidence: &Evidence) -> Option<NaiveDateTime> {
    evidence.timestamp.map(|ts| ts.start())
}

/// Start and end of an event; an end-less event lasts
/// [`DEFAULT_EVENT_MINUTES`].
fn span_of(event: &Evidence) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let ts = event.timestamp?;
    let (start, end) = (ts.start(), ts.end());
    if end > start {
        Some((start, end))
    } else {
        Some((start, start + TimeDelta::minutes(DEFAULT_EVENT_MINUTES)))
    }
}

fn window_of(event: &Evidence) -> Option<EventWindow> {
    let (start, end) = span_of(event)?;
    let participants = match &event.details {
        EvidenceDetails::Event { attendees, .. } => attendees
            .iter()
            .filter_map(|a| a.label().map(String::from))
            .collect(),
        _ => vec![],
    };
    Some(EventWindow {
        title: event.title.clone(),
        description: event.text.clone(),
        start,
        end,
        participants,
        source_id: Some(event.id.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;
    use vea_core::{Participant, Timestamp};

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn event(id: &str, start: NaiveDateTime, end: NaiveDateTime) -> Evidence {
        Evidence {
            id: id.into(),
            title: format!("Meeting {id}"),
            timestamp: Some(Timestamp::range(start, end)),
            text: String::new(),
            tags: BTreeSet::new(),
            source_ref: format!("calendar:primary/{id}"),
            aliases_declared: vec![],
            details: EvidenceDetails::Event {
                location: None,
                attendees: vec![Participant {
                    name: Some("Ana".into()),
                    email: None,
                    response_status: None,
                }],
                all_day: false,
            },
        }
    }

    fn all_day(id: &str, d: u32) -> Evidence {
        let day = NaiveDate::from_ymd_opt(2025, 6, d).unwrap();
        Evidence {
            timestamp: Some(Timestamp::full_day(day)),
            details: EvidenceDetails::Event {
                location: None,
                attendees: vec![],
                all_day: true,
            },
            ..event(id, at(d, 0, 0), at(d, 1, 0))
        }
    }

    fn evidence() -> EvidenceSet {
        vec![
            all_day("holiday", 2),
            event("late", at(2, 15, 0), at(2, 16, 0)),
            event("early", at(2, 10, 0), at(2, 11, 0)),
            event("twin", at(2, 10, 0), at(2, 10, 30)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn next_picks_earliest_timed_event_first_on_ties() {
        let selector = EventSelector::Next {
            after: at(2, 8, 0),
            lookahead_minutes: DEFAULT_LOOKAHEAD_MINUTES,
        };
        let window = select(&selector, &evidence()).unwrap();
        assert_eq!(window.source_id.as_deref(), Some("early"));
        assert_eq!(window.participants, vec!["Ana"]);
    }

    #[test]
    fn next_respects_lookahead() {
        let selector = EventSelector::Next {
            after: at(2, 8, 0),
            lookahead_minutes: 60,
        };
        assert!(select(&selector, &evidence()).is_none());
    }

    #[test]
    fn current_and_starting_at() {
        let current = select(&EventSelector::Current { at: at(2, 15, 30) }, &evidence()).unwrap();
        assert_eq!(current.title, "Meeting late");

        let exact = select(&EventSelector::StartingAt { at: at(2, 15, 0) }, &evidence()).unwrap();
        assert_eq!(exact.end, at(2, 16, 0));
    }

    #[test]
    fn event_without_end_gets_default_length() {
        let open_ended: EvidenceSet = vec![Evidence {
            timestamp: Some(Timestamp::at(at(2, 9, 0))),
            ..event("standup", at(2, 9, 0), at(2, 9, 0))
        }]
        .into_iter()
        .collect();

        let exact = select(&EventSelector::StartingAt { at: at(2, 9, 0) }, &open_ended).unwrap();
        assert_eq!(exact.end, at(2, 9, 30));

        let current = select(&EventSelector::Current { at: at(2, 9, 10) }, &open_ended);
        assert_eq!(current.unwrap().source_id.as_deref(), Some("standup"));

        let task = TaskContext::prepare_event(
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            EventTarget::Window(exact),
        );
        let (start, end) = task.window().unwrap();
        assert!(start < end);
    }

    #[test]
    fn resolution_keeps_focus_override() {
        let task = TaskContext::prepare_event(
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            EventTarget::Select(EventSelector::StartingAt { at: at(2, 15, 0) }),
        )
        .with_focus_terms(vec!["pricing".into()]);
        let resolved = resolve_task(task, &evidence());
        assert!(resolved.event().is_some());
        assert_eq!(resolved.focus_terms, Some(vec!["pricing".to_string()]));
    }

    #[test]
    fn unmatched_selector_becomes_incomplete_context() {
        let task = TaskContext::prepare_event(
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            EventTarget::Select(EventSelector::Current { at: at(2, 20, 0) }),
        );
        let resolved = resolve_task(task, &evidence());
        let err = resolved.window().unwrap_err();
        assert!(err.to_string().contains("no calendar event matches"));
    }

    #[test]
    fn daily_task_passes_through() {
        let task = TaskContext::daily(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        assert_eq!(resolve_task(task.clone(), &evidence()), task);
    }
}
