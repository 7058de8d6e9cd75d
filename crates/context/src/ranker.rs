//! Relevance ranker: score, sort and cap Evidence per kind.
//!
//! # Scoring
//!
//! 1. **Temporal**: inside the task window scores `containment`; outside
//!    scores `proximity / (1 + days away)`, so containment always wins
//! 2. **Marker boost**: any urgency/importance tag adds `marker`
//! 3. **Lexical overlap**: `overlap_per_term` per distinct shared term with
//!    the task's descriptive terms, capped at `overlap_cap`
//!
//! Ties keep chronological order, most recent first; undated items last.
//!
//! # Floor
//!
//! Events overlapping the window and open tasks due by the end of the
//! window (overdue included) are never dropped. The cap applies to the
//! remaining items of a kind.
//!
//! # Token ceiling
//!
//! After the count caps, an optional token ceiling admits the surviving
//! non-floor items in rank order while their estimated size fits. The
//! ceiling is shared by all kinds or applies to each kind separately.
//!
//! # Determinism
//!
//! Only ordered collections and total float ordering are used; identical
//! inputs produce identical output.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use tracing::debug;
use vea_core::{
    AssemblyError, Budget, BudgetScope, ContextMode, DocumentEntry, DropInfo, Evidence,
    EvidenceKind, EvidenceSet, KindCaps, TaskContext, TaskDescriptor,
};

use crate::{text, token};

/// Score increments. Only their relative order is a contract.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    pub containment: f32,
    pub proximity: f32,
    pub marker: f32,
    pub overlap_per_term: f32,
    pub overlap_cap: f32,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            containment: 10.0,
            proximity: 5.0,
            marker: 3.0,
            overlap_per_term: 1.0,
            overlap_cap: 5.0,
        }
    }
}

/// One kind's ranked items.
#[derive(Debug, Clone)]
pub struct RankedGroup {
    pub kind: EvidenceKind,
    pub entries: Vec<DocumentEntry>,
    /// Items of this kind before truncation.
    pub total: usize,
}

/// Ranker output: one group per kind, in document order.
#[derive(Debug, Clone)]
pub struct RankedEvidence {
    pub mode: ContextMode,
    pub groups: Vec<RankedGroup>,
    pub drops: Vec<DropInfo>,
}

impl RankedEvidence {
    pub fn group(&self, kind: EvidenceKind) -> Option<&RankedGroup> {
        self.groups.iter().find(|g| g.kind == kind)
    }

    pub fn count(&self, kind: EvidenceKind) -> usize {
        self.group(kind).map_or(0, |g| g.entries.len())
    }
}

/// Why an item was cut from its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cut {
    Count,
    Tokens,
}

struct Scored {
    idx: usize,
    score: f32,
    protected: bool,
    tokens: usize,
    cut: Option<Cut>,
    evidence: Evidence,
}

#[derive(Debug, Clone, Default)]
pub struct RelevanceRanker {
    weights: RankingWeights,
}

impl RelevanceRanker {
    pub fn new(weights: RankingWeights) -> Self {
        Self { weights }
    }

    /// Rank `evidence` for `task` under `budget`. Takes ownership: the
    /// ranker only drops and reorders, it never edits content.
    pub fn rank(
        &self,
        evidence: EvidenceSet,
        task: &TaskContext,
        budget: &Budget,
    ) -> Result<RankedEvidence, AssemblyError> {
        self.rank_with_known_names(evidence, task, budget, &BTreeSet::new())
    }

    /// Like [`rank`](Self::rank), with the terms of known note names and
    /// aliases added to the focus terms of daily and weekly runs.
    pub fn rank_with_known_names(
        &self,
        evidence: EvidenceSet,
        task: &TaskContext,
        budget: &Budget,
        known: &BTreeSet<String>,
    ) -> Result<RankedEvidence, AssemblyError> {
        let (start, end) = task.window()?;
        let terms = context_terms(&evidence, task, (start, end), known);

        let mut buckets: Vec<Vec<(usize, Evidence)>> = EvidenceKind::ALL.iter().map(|_| Vec::new()).collect();
        for (idx, item) in evidence.into_vec().into_iter().enumerate() {
            buckets[item.kind() as usize].push((idx, item));
        }

        let (mode, groups, drops) = match budget {
            Budget::Unbounded => {
                let groups: Vec<RankedGroup> = EvidenceKind::ALL
                    .into_iter()
                    .zip(buckets)
                    .map(|(kind, items)| RankedGroup {
                        kind,
                        total: items.len(),
                        entries: chronological(items),
                    })
                    .collect();
                (ContextMode::FullContext, groups, Vec::new())
            }
            Budget::Ranked(caps) => {
                let mut scored: Vec<(EvidenceKind, Vec<Scored>)> = EvidenceKind::ALL
                    .into_iter()
                    .zip(buckets)
                    .map(|(kind, items)| {
                        (kind, self.rank_group(kind, items, caps, (start, end), &terms))
                    })
                    .collect();

                if let Some(limit) = caps.tokens {
                    match caps.token_scope {
                        BudgetScope::Group => {
                            for (_, items) in &mut scored {
                                fit_tokens(items.iter_mut(), limit);
                            }
                        }
                        BudgetScope::Global => {
                            let mut all: Vec<&mut Scored> = scored
                                .iter_mut()
                                .flat_map(|(_, items)| items.iter_mut())
                                .collect();
                            all.sort_by(|a, b| by_rank(a, b));
                            fit_tokens(all.into_iter(), limit);
                        }
                    }
                }

                let mut groups = Vec::with_capacity(scored.len());
                let mut drops = Vec::new();
                for (kind, items) in scored {
                    let (group, dropped) = finish_group(kind, items, caps);
                    groups.push(group);
                    drops.extend(dropped);
                }
                (ContextMode::Ranked, groups, drops)
            }
        };

        debug!(
            ?mode,
            kept = groups.iter().map(|g| g.entries.len()).sum::<usize>(),
            dropped = drops.iter().map(|d| d.items_dropped).sum::<usize>(),
            "Evidence ranked"
        );
        Ok(RankedEvidence {
            mode,
            groups,
            drops,
        })
    }

    /// Score and sort one kind, then mark what falls past its count cap.
    fn rank_group(
        &self,
        kind: EvidenceKind,
        items: Vec<(usize, Evidence)>,
        caps: &KindCaps,
        window: (NaiveDateTime, NaiveDateTime),
        terms: &BTreeSet<String>,
    ) -> Vec<Scored> {
        let mut scored: Vec<Scored> = items
            .into_iter()
            .map(|(idx, evidence)| Scored {
                idx,
                score: self.score(&evidence, window, terms),
                protected: is_floor(&evidence, window),
                tokens: token::estimate_evidence_tokens(&evidence),
                cut: None,
                evidence,
            })
            .collect();
        scored.sort_by(by_rank);

        let mut room = caps
            .cap_for(kind)
            .saturating_sub(scored.iter().filter(|s| s.protected).count());
        for s in scored.iter_mut().filter(|s| !s.protected) {
            if room > 0 {
                room -= 1;
            } else {
                s.cut = Some(Cut::Count);
            }
        }
        scored
    }

    /// Relevance score of one item against the task window and terms.
    pub fn score(
        &self,
        item: &Evidence,
        (start, end): (NaiveDateTime, NaiveDateTime),
        terms: &BTreeSet<String>,
    ) -> f32 {
        let w = &self.weights;
        let mut score = 0.0;

        if let Some(ts) = item.timestamp {
            if ts.overlaps(start, end) {
                score += w.containment;
            } else {
                let days = ts.distance_to(start, end).num_seconds() as f32 / 86_400.0;
                score += w.proximity / (1.0 + days);
            }
        }

        if !item.tags.is_empty() {
            score += w.marker;
        }

        if !terms.is_empty() {
            let mut own = text::terms(&item.title);
            own.extend(text::terms(&item.text));
            let shared = own.intersection(terms).count() as f32;
            score += (shared * w.overlap_per_term).min(w.overlap_cap);
        }

        score
    }
}

/// Events overlapping the window; open tasks due before the window ends.
fn is_floor(item: &Evidence, (start, end): (NaiveDateTime, NaiveDateTime)) -> bool {
    match (item.kind(), item.timestamp) {
        (EvidenceKind::Event, Some(ts)) => ts.overlaps(start, end),
        (EvidenceKind::Task, Some(ts)) => item.is_open_task() && ts.start() < end,
        _ => false,
    }
}

fn recency(s: &Scored) -> Option<NaiveDateTime> {
    s.evidence.timestamp.map(|ts| ts.start())
}

/// Score descending, then most recent, then input order.
fn by_rank(a: &Scored, b: &Scored) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| recency(b).cmp(&recency(a)))
        .then(a.idx.cmp(&b.idx))
}

/// Admit items in the given order while their estimated tokens fit under
/// `limit`; an item that does not fit is cut and later, smaller ones may
/// still get in. Floor items neither count nor get cut.
fn fit_tokens<'a>(items: impl Iterator<Item = &'a mut Scored>, limit: usize) {
    let mut used = 0usize;
    for s in items.filter(|s| s.cut.is_none() && !s.protected) {
        if used + s.tokens > limit {
            s.cut = Some(Cut::Tokens);
        } else {
            used += s.tokens;
        }
    }
}

/// Kept entries in rank order, plus one drop record per cut reason.
fn finish_group(
    kind: EvidenceKind,
    items: Vec<Scored>,
    caps: &KindCaps,
) -> (RankedGroup, Vec<DropInfo>) {
    let total = items.len();
    let count_cut = items.iter().filter(|s| s.cut == Some(Cut::Count)).count();
    let token_cut = items.iter().filter(|s| s.cut == Some(Cut::Tokens)).count();

    let entries = items
        .into_iter()
        .filter(|s| s.cut.is_none())
        .map(|s| DocumentEntry {
            evidence: s.evidence,
            score: Some(s.score),
            protected: s.protected,
        })
        .collect();

    let mut drops = Vec::new();
    if count_cut > 0 {
        drops.push(DropInfo {
            kind,
            items_dropped: count_cut,
            reason: format!(
                "{kind} cap of {} reached; lowest-scored items dropped",
                caps.cap_for(kind)
            ),
        });
    }
    if token_cut > 0 {
        let scope = match caps.token_scope {
            BudgetScope::Global => "shared",
            BudgetScope::Group => "per-kind",
        };
        drops.push(DropInfo {
            kind,
            items_dropped: token_cut,
            reason: format!(
                "{scope} token budget of {} reached; items that did not fit dropped",
                caps.tokens.unwrap_or_default()
            ),
        });
    }
    (
        RankedGroup {
            kind,
            entries,
            total,
        },
        drops,
    )
}

/// Full-context order: dated items by start time, then undated items in
/// input order.
fn chronological(mut items: Vec<(usize, Evidence)>) -> Vec<DocumentEntry> {
    items.sort_by(|(ai, a), (bi, b)| {
        match (a.timestamp, b.timestamp) {
            (Some(x), Some(y)) => x.start().cmp(&y.start()),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then(ai.cmp(bi))
    });
    items
        .into_iter()
        .map(|(_, evidence)| DocumentEntry {
            evidence,
            score: None,
            protected: false,
        })
        .collect()
}

/// The task's focus terms.
///
/// An explicit override on the task replaces everything else. Otherwise
/// an event run uses the event's title, description and participants, and
/// a daily or weekly run uses the titles of events and open tasks inside
/// the window plus the `known` note names and aliases.
pub fn context_terms(
    evidence: &EvidenceSet,
    task: &TaskContext,
    (start, end): (NaiveDateTime, NaiveDateTime),
    known: &BTreeSet<String>,
) -> BTreeSet<String> {
    if let Some(focus) = &task.focus_terms {
        return focus.iter().flat_map(|t| text::terms(t)).collect();
    }

    let mut terms = BTreeSet::new();
    match task.event() {
        Some(event) => {
            terms.extend(text::terms(&event.title));
            terms.extend(text::terms(&event.description));
            for participant in &event.participants {
                terms.extend(text::terms(participant));
            }
        }
        None if matches!(task.descriptor, TaskDescriptor::Daily | TaskDescriptor::Weekly(_)) => {
            for item in evidence.iter().filter(|e| {
                let in_window = e.timestamp.is_some_and(|ts| ts.overlaps(start, end));
                in_window && (e.kind() == EvidenceKind::Event || e.is_open_task())
            }) {
                terms.extend(text::terms(&item.title));
            }
            terms.extend(known.iter().cloned());
        }
        None => {}
    }
    terms
}
