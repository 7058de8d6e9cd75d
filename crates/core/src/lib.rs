//! # Vea Core
//!
//! Domain types, traits, and error definitions for the Vea context engine.
//! This crate holds **no behavior beyond the data model**: every stage of
//! the pipeline (normalize, canonicalize, extract, rank, assemble) lives in
//! `vea-context` and works against the types defined here.
//!
//! ## Design Philosophy
//!
//! The two collaborator boundaries are traits here:
//! - [`SourceLoader`]: anything that yields raw records (files, APIs)
//! - [`Summarizer`]: anything that turns a context document into text
//!
//! Implementations live in their respective crates, so the engine can be
//! tested with in-memory records and a scripted summarizer.

pub mod directive;
pub mod document;
pub mod error;
pub mod evidence;
pub mod raw;
pub mod source;
pub mod summarizer;
pub mod task;
pub mod warning;

// Re-export key types at crate root for ergonomics
pub use directive::Directive;
pub use document::{
    AssemblyMetadata, ContextDocument, ContextMode, DocumentEntry, DocumentGroups, DropInfo,
    GroupStats, TaskMetadata,
};
pub use error::{AssemblyError, Error, LoadError, NormalizeError, Result, SummarizeError};
pub use evidence::{Evidence, EvidenceDetails, EvidenceKind, EvidenceSet, Participant, Timestamp};
pub use raw::RawRecord;
pub use source::{SourceBatch, SourceLoader};
pub use summarizer::Summarizer;
pub use task::{Budget, BudgetScope, EventSelector, EventTarget, EventWindow, KindCaps, TaskContext, TaskDescriptor, WeekSpan};
pub use warning::RunWarning;
