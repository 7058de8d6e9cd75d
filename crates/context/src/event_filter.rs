//! Calendar event filtering.
//!
//! Runs once after normalization, before anything reads the calendar:
//! a filtered event is never selected for preparation, never protected by
//! the floor and never reaches the document. Each reason is reported as a
//! [`DropInfo`] in the document metadata.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use tracing::debug;
use vea_core::{DropInfo, Evidence, EvidenceDetails, EvidenceKind, EvidenceSet};

/// Why an event was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FilterReason {
    /// The title contains a blacklisted keyword.
    Blacklisted,
    /// The user's own attendee entry says `declined`.
    Declined,
    /// A timed event that started before the run's cutoff.
    Past,
}

impl FilterReason {
    fn describe(self) -> &'static str {
        match self {
            Self::Blacklisted => "event title matches the blacklist",
            Self::Declined => "event declined by you",
            Self::Past => "event started before now",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Lowercased title keywords.
    blacklist: Vec<String>,
    /// Lowercased address of the user.
    my_email: Option<String>,
    skip_before: Option<NaiveDateTime>,
}

impl EventFilter {
    pub fn new(blacklist: &[String], my_email: Option<&str>) -> Self {
        Self {
            blacklist: blacklist
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            my_email: my_email
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty()),
            skip_before: None,
        }
    }

    /// Also drop timed events starting before `now`. All-day events stay.
    pub fn with_skip_before(mut self, now: NaiveDateTime) -> Self {
        self.skip_before = Some(now);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.blacklist.is_empty() && self.my_email.is_none() && self.skip_before.is_none()
    }

    /// The first reason `event` must go, if any.
    pub fn check(&self, event: &Evidence) -> Option<FilterReason> {
        let EvidenceDetails::Event {
            attendees, all_day, ..
        } = &event.details
        else {
            return None;
        };

        let title = event.title.to_lowercase();
        if self.blacklist.iter().any(|k| title.contains(k.as_str())) {
            return Some(FilterReason::Blacklisted);
        }

        if let Some(me) = &self.my_email {
            let declined = attendees.iter().any(|a| {
                a.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(me))
                    && a
                        .response_status
                        .as_deref()
                        .is_some_and(|s| s.eq_ignore_ascii_case("declined"))
            });
            if declined {
                return Some(FilterReason::Declined);
            }
        }

        if let (Some(now), Some(ts)) = (self.skip_before, event.timestamp)
            && !*all_day
            && !ts.is_full_day()
            && ts.start() < now
        {
            return Some(FilterReason::Past);
        }
        None
    }

    /// Remove every filtered event from `evidence`; one drop record per
    /// reason that removed anything.
    pub fn apply(&self, evidence: &mut EvidenceSet) -> Vec<DropInfo> {
        if self.is_empty() {
            return Vec::new();
        }

        let mut counts: BTreeMap<FilterReason, usize> = BTreeMap::new();
        evidence.retain(|item| match self.check(item) {
            Some(reason) => {
                debug!(id = %item.id, ?reason, "Event filtered out");
                *counts.entry(reason).or_default() += 1;
                false
            }
            None => true,
        });

        counts
            .into_iter()
            .map(|(reason, items_dropped)| DropInfo {
                kind: EvidenceKind::Event,
                items_dropped,
                reason: reason.describe().to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;
    use vea_core::{Participant, Timestamp};

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn event(id: &str, title: &str, h: u32, attendees: Vec<Participant>) -> Evidence {
        Evidence {
            id: id.into(),
            title: title.into(),
            timestamp: Some(Timestamp::range(at(h), at(h + 1))),
            text: String::new(),
            tags: BTreeSet::new(),
            source_ref: format!("calendar:primary/{id}"),
            aliases_declared: vec![],
            details: EvidenceDetails::Event {
                location: None,
                attendees,
                all_day: false,
            },
        }
    }

    fn attendee(email: &str, status: &str) -> Participant {
        Participant {
            name: None,
            email: Some(email.into()),
            response_status: Some(status.into()),
        }
    }

    fn ids(set: &EvidenceSet) -> Vec<&str> {
        set.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn blacklisted_titles_match_case_insensitively() {
        let filter = EventFilter::new(&["focus time".into(), " ".into()], None);
        let mut set: EvidenceSet = vec![
            event("a", "FOCUS TIME (blocked)", 9, vec![]),
            event("b", "Design review", 11, vec![]),
        ]
        .into_iter()
        .collect();

        let drops = filter.apply(&mut set);
        assert_eq!(ids(&set), vec!["b"]);
        assert_eq!(drops.len(), 1);
        assert_eq!(drops[0].items_dropped, 1);
        assert!(drops[0].reason.contains("blacklist"));
    }

    #[test]
    fn only_my_decline_counts() {
        let filter = EventFilter::new(&[], Some("Me@Example.com"));
        let mut set: EvidenceSet = vec![
            event("mine", "Budget", 9, vec![attendee("me@example.com", "declined")]),
            event(
                "theirs",
                "Sync",
                10,
                vec![
                    attendee("ana@example.com", "declined"),
                    attendee("me@example.com", "accepted"),
                ],
            ),
            event("none", "Lunch", 12, vec![]),
        ]
        .into_iter()
        .collect();

        let drops = filter.apply(&mut set);
        assert_eq!(ids(&set), vec!["theirs", "none"]);
        assert!(drops[0].reason.contains("declined"));
    }

    #[test]
    fn past_timed_events_go_but_all_day_stays() {
        let holiday = Evidence {
            timestamp: Some(Timestamp::full_day(at(0).date())),
            details: EvidenceDetails::Event {
                location: None,
                attendees: vec![],
                all_day: true,
            },
            ..event("holiday", "Holiday", 0, vec![])
        };
        let filter = EventFilter::default().with_skip_before(at(10));
        let mut set: EvidenceSet = vec![
            holiday,
            event("early", "Standup", 9, vec![]),
            event("later", "Review", 10, vec![]),
        ]
        .into_iter()
        .collect();

        filter.apply(&mut set);
        assert_eq!(ids(&set), vec!["holiday", "later"]);
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let filter = EventFilter::new(&[], None);
        assert!(filter.is_empty());
        let mut set: EvidenceSet = vec![event("a", "Anything", 9, vec![])].into_iter().collect();
        assert!(filter.apply(&mut set).is_empty());
        assert_eq!(set.len(), 1);
    }
}
