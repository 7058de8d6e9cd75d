//! The context engine: the heart of Vea.
//!
//! One run turns raw provider records into a single [`ContextDocument`]:
//!
//! 1. **Normalize** every source batch into Evidence (malformed records
//!    become warnings) and filter unwanted calendar events
//! 2. **Canonicalize** note names through the alias graph
//! 3. **Extract** today's directives from the journal
//! 4. **Resolve** the task window (the target event for prepare-event runs)
//! 5. **Rank** each Evidence kind against the window and budget
//! 6. **Assemble** the document handed to the summarizer
//!
//! Every stage is a pure function of its inputs; the only async work is
//! fanning normalization out across sources.
//!
//! [`ContextDocument`]: vea_core::ContextDocument

pub mod alias;
pub mod assembler;
pub mod directive;
pub mod event_filter;
pub mod event_window;
pub mod normalizer;
pub mod pipeline;
pub mod ranker;
pub mod text;
pub mod token;

pub use alias::AliasGraph;
pub use assembler::ContextAssembler;
pub use directive::TriggerMatcher;
pub use event_filter::{EventFilter, FilterReason};
pub use normalizer::{NormalizedBatch, Normalizer, NormalizerSettings};
pub use pipeline::{ContextPipeline, PipelineSettings, RunOutput};
pub use ranker::{RankedEvidence, RankedGroup, RankingWeights, RelevanceRanker};
