//! Pipeline orchestration.
//!
//! Normalize → event filter → alias graph → directives → event resolution
//! → rank → assemble. Each stage owns the Evidence collection in turn; nothing is
//! shared between runs, so one pipeline can serve concurrent invocations.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use vea_core::{
    Budget, ContextDocument, Error, EvidenceSet, Result, RunWarning, SourceBatch, Summarizer,
    TaskContext,
};

use crate::alias::AliasGraph;
use crate::assembler::ContextAssembler;
use crate::directive::{self, TriggerMatcher};
use crate::event_filter::EventFilter;
use crate::event_window;
use crate::normalizer::{NormalizedBatch, Normalizer, NormalizerSettings};
use crate::ranker::{RankingWeights, RelevanceRanker};

/// Everything a pipeline needs besides the per-run inputs.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub normalizer: NormalizerSettings,
    pub event_filter: EventFilter,
    /// Directive trigger token.
    pub trigger: String,
    pub weights: RankingWeights,
    /// Remove trigger lines from journals not dated today.
    pub strip_stale_directives: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            normalizer: NormalizerSettings::default(),
            event_filter: EventFilter::default(),
            trigger: "Vea".into(),
            weights: RankingWeights::default(),
            strip_stale_directives: true,
        }
    }
}

/// A successful run: the document plus every non-fatal warning.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub document: ContextDocument,
    pub warnings: Vec<RunWarning>,
}

#[derive(Debug, Clone)]
pub struct ContextPipeline {
    normalizer: Arc<Normalizer>,
    event_filter: EventFilter,
    trigger: String,
    ranker: RelevanceRanker,
    assembler: ContextAssembler,
    strip_stale: bool,
}

impl ContextPipeline {
    pub fn new(settings: PipelineSettings) -> Self {
        Self {
            normalizer: Arc::new(Normalizer::new(settings.normalizer)),
            event_filter: settings.event_filter,
            trigger: settings.trigger,
            ranker: RelevanceRanker::new(settings.weights),
            assembler: ContextAssembler::new(),
            strip_stale: settings.strip_stale_directives,
        }
    }

    /// Run every stage for one task.
    ///
    /// Only `IncompleteContext` (surfaced as `Error::Assembly`) fails the
    /// run; malformed records and alias conflicts come back as warnings,
    /// filtered events as drops in the document metadata.
    pub async fn run(
        &self,
        batches: Vec<SourceBatch>,
        task: TaskContext,
        budget: &Budget,
    ) -> Result<RunOutput> {
        let mut warnings: Vec<RunWarning> = Vec::new();

        // ── Normalize (per source, concurrently) ───────────────────────────
        let normalized = self.normalize_all(batches).await?;
        let mut evidence = EvidenceSet::new();
        for batch in normalized {
            for err in batch.rejected {
                let w = RunWarning::from(err);
                warn!(warning = %w, "Skipping malformed record");
                warnings.push(w);
            }
            for item in batch.evidence {
                if let Some(old) = evidence.insert(item) {
                    debug!(id = %old.id, "Duplicate evidence id replaced");
                }
            }
        }

        let filtered = self.event_filter.apply(&mut evidence);

        // ── Alias graph: build fully, then resolve ─────────────────────────
        let (aliases, conflicts) = AliasGraph::build(&evidence);
        warnings.extend(conflicts);
        aliases.resolve(&mut evidence);

        // ── Directives (today only) ────────────────────────────────────────
        let matcher = TriggerMatcher::new(&self.trigger, &aliases);
        if self.strip_stale {
            directive::strip_stale(&mut evidence, task.today, &matcher);
        }
        let directives = directive::extract(&evidence, task.today, &matcher);

        // ── Task context ───────────────────────────────────────────────────
        let task = event_window::resolve_task(task, &evidence);
        task.window()?;

        // ── Rank and assemble ──────────────────────────────────────────────
        let mut ranked =
            self.ranker
                .rank_with_known_names(evidence, &task, budget, &aliases.terms())?;
        ranked.drops.splice(0..0, filtered);
        let document = self.assembler.assemble(&task, ranked, directives)?;

        info!(
            task = %document.task().task,
            label = %document.task().label,
            evidence = document.evidence_count(),
            directives = document.directives().len(),
            warnings = warnings.len(),
            "Context assembled"
        );
        Ok(RunOutput { document, warnings })
    }

    /// Hand a finished document to the summarizer; the returned text is
    /// passed through uninspected.
    pub async fn summarize(
        &self,
        document: &ContextDocument,
        summarizer: &dyn Summarizer,
    ) -> Result<String> {
        debug!(summarizer = summarizer.name(), "Summarizing context");
        Ok(summarizer.summarize(document).await?)
    }

    /// One blocking task per source; results come back in source order no
    /// matter which task finishes first.
    async fn normalize_all(&self, batches: Vec<SourceBatch>) -> Result<Vec<NormalizedBatch>> {
        let mut set = JoinSet::new();
        let count = batches.len();
        for (idx, batch) in batches.into_iter().enumerate() {
            let normalizer = Arc::clone(&self.normalizer);
            set.spawn_blocking(move || (idx, normalizer.normalize_batch(&batch)));
        }

        let mut slots: Vec<Option<NormalizedBatch>> = (0..count).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            let (idx, batch) =
                joined.map_err(|e| Error::Internal(format!("normalizer task failed: {e}")))?;
            slots[idx] = Some(batch);
        }
        Ok(slots.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use vea_core::raw::{RawEmail, RawEvent, RawJournal, RawNote};
    use vea_core::{
        AssemblyError, EventSelector, EventTarget, EvidenceKind, KindCaps, RawRecord,
        SummarizeError,
    };

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn journal(stem: &str, content: &str) -> RawRecord {
        RawRecord::Journal(RawJournal {
            filename: stem.into(),
            content: content.into(),
        })
    }

    fn note(name: &str, content: &str) -> RawRecord {
        RawRecord::Note(RawNote {
            filename: name.into(),
            content: content.into(),
        })
    }

    fn event(id: &str, start: &str, end: &str) -> RawRecord {
        RawRecord::Event(RawEvent {
            calendar_id: "primary".into(),
            event_id: Some(id.into()),
            summary: format!("Meeting {id}"),
            description: String::new(),
            location: None,
            start: Some(start.into()),
            end: Some(end.into()),
            attendees: vec![],
        })
    }

    fn email(id: &str, date: Option<&str>) -> RawRecord {
        RawRecord::Email(RawEmail {
            message_id: id.into(),
            label: "inbox".into(),
            subject: format!("Subject {id}"),
            from: "ana@example.com".into(),
            date: date.map(String::from),
            body: "body".into(),
        })
    }

    fn batches() -> Vec<SourceBatch> {
        vec![
            SourceBatch::new(
                "journals",
                vec![
                    journal("2025_06_01", "- Vea include X\n- talked about [[PA]]"),
                    journal("2025_06_02", "- Vea do A\n- [[Vea]] do B"),
                ],
            ),
            SourceBatch::new(
                "notes",
                vec![
                    note("Project Alpha", "alias:: PA\n- kickoff"),
                    note("Beta", "alias:: PA\n- other"),
                ],
            ),
            SourceBatch::new(
                "calendar",
                vec![
                    event("e1", "2025-06-02T09:00:00+02:00", "2025-06-02T10:00:00+02:00"),
                    event("e2", "2025-06-02T11:00:00+02:00", "2025-06-02T12:00:00+02:00"),
                    event("e3", "2025-06-02T14:00:00+02:00", "2025-06-02T15:00:00+02:00"),
                ],
            ),
            SourceBatch::new(
                "gmail",
                vec![
                    email("m1", Some("2025-06-02T08:00:00+02:00")),
                    email("m2", None),
                ],
            ),
        ]
    }

    fn pipeline() -> ContextPipeline {
        ContextPipeline::new(PipelineSettings::default())
    }

    #[tokio::test]
    async fn daily_run_end_to_end() {
        let budget = Budget::Ranked(KindCaps {
            events: 1,
            ..KindCaps::default()
        });
        let out = pipeline()
            .run(batches(), TaskContext::daily(today()), &budget)
            .await
            .unwrap();
        let doc = &out.document;

        let directives: Vec<_> = doc.directives().iter().map(|d| d.raw_text.as_str()).collect();
        assert_eq!(directives, vec!["do A", "do B"]);

        // Budget floor: all three in-window events despite a cap of one.
        assert_eq!(doc.group(EvidenceKind::Event).len(), 3);

        // Alias conflict resolved first-wins; stale directive stripped.
        let old = doc
            .group(EvidenceKind::JournalEntry)
            .iter()
            .find(|e| e.evidence.id == "journal:2025-06-01")
            .unwrap();
        assert_eq!(old.evidence.text, "- talked about [[Project Alpha]]");

        assert_eq!(doc.group(EvidenceKind::Email).len(), 1);
        assert_eq!(out.warnings.len(), 2);
        assert!(out
            .warnings
            .iter()
            .any(|w| matches!(w, RunWarning::MalformedRecord { .. })));
        assert!(out.warnings.iter().any(|w| matches!(
            w,
            RunWarning::AliasConflict { kept, rejected, .. } if kept == "Project Alpha" && rejected == "Beta"
        )));
    }

    #[tokio::test]
    async fn repeated_runs_are_byte_identical() {
        let budget = Budget::Ranked(KindCaps::uniform(2));
        let p = pipeline();
        let a = p
            .run(batches(), TaskContext::daily(today()), &budget)
            .await
            .unwrap();
        let b = p
            .run(batches(), TaskContext::daily(today()), &budget)
            .await
            .unwrap();
        assert_eq!(
            a.document.to_json_pretty().unwrap(),
            b.document.to_json_pretty().unwrap()
        );
    }

    #[tokio::test]
    async fn full_context_keeps_every_item() {
        let out = pipeline()
            .run(batches(), TaskContext::daily(today()), &Budget::Unbounded)
            .await
            .unwrap();
        let doc = &out.document;
        assert_eq!(doc.group(EvidenceKind::Event).len(), 3);
        assert_eq!(doc.group(EvidenceKind::JournalEntry).len(), 2);
        assert_eq!(doc.group(EvidenceKind::Note).len(), 2);
        assert_eq!(doc.group(EvidenceKind::Email).len(), 1);
        assert!(doc.metadata().drops.is_empty());
    }

    #[tokio::test]
    async fn unresolvable_event_is_fatal() {
        let task = TaskContext::prepare_event(
            today(),
            EventTarget::Select(EventSelector::Next {
                after: today().and_hms_opt(20, 0, 0).unwrap(),
                lookahead_minutes: 60,
            }),
        );
        let err = pipeline()
            .run(batches(), task, &Budget::Ranked(KindCaps::default()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Assembly(AssemblyError::IncompleteContext { .. })
        ));
    }

    #[tokio::test]
    async fn next_event_is_resolved_from_calendar() {
        let task = TaskContext::prepare_event(
            today(),
            EventTarget::Select(EventSelector::Next {
                after: today().and_hms_opt(10, 30, 0).unwrap(),
                lookahead_minutes: 24 * 60,
            }),
        );
        let out = pipeline()
            .run(batches(), task, &Budget::Ranked(KindCaps::default()))
            .await
            .unwrap();
        let event = out.document.task().event.as_ref().unwrap();
        assert_eq!(event.title, "Meeting e2");
        assert_eq!(out.document.task().task, "prepare_event");
    }

    struct Echo;

    #[async_trait]
    impl Summarizer for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn summarize(&self, document: &ContextDocument) -> std::result::Result<String, SummarizeError> {
            Ok(format!("{} items", document.evidence_count()))
        }
    }

    #[tokio::test]
    async fn summarizer_output_is_passed_through() {
        let p = pipeline();
        let out = p
            .run(batches(), TaskContext::daily(today()), &Budget::Unbounded)
            .await
            .unwrap();
        let text = p.summarize(&out.document, &Echo).await.unwrap();
        assert_eq!(text, "8 items");
    }
}
