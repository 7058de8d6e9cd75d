//! # Vea Sources
//!
//! File-based [`SourceLoader`] implementations. Each loader does its own
//! I/O and hands the engine one complete [`SourceBatch`]; nothing here
//! interprets record contents beyond splitting files into raw records.
//!
//! | Loader | Reads | Record kind |
//! |--------|-------|-------------|
//! | [`JournalDirLoader`] | `<journal_dir>/YYYY_MM_DD.md` | journal |
//! | [`NotesDirLoader`] | `<notes_dir>/*.md` | note |
//! | [`JsonlRecordLoader`] | `<records_dir>/*.jsonl` | any, tagged by `kind` |
//!
//! [`SourceLoader`]: vea_core::SourceLoader
//! [`SourceBatch`]: vea_core::SourceBatch

pub mod jsonl;
pub mod markdown;

pub use jsonl::JsonlRecordLoader;
pub use markdown::{JournalDirLoader, NotesDirLoader};

/// Default per-file size limit for markdown sources, in bytes.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 100_000;
