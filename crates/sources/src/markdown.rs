//! Journal and notes directories (Logseq-style markdown graphs).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use tracing::{debug, info, warn};
use vea_core::raw::{RawJournal, RawNote};
use vea_core::{LoadError, RawRecord, SourceBatch, SourceLoader};

use crate::DEFAULT_MAX_FILE_BYTES;

/// Loads the journal pages dated within `days` before `until`, inclusive.
#[derive(Debug, Clone)]
pub struct JournalDirLoader {
    dir: PathBuf,
    until: NaiveDate,
    days: u32,
    max_file_bytes: u64,
}

impl JournalDirLoader {
    pub fn new(dir: impl Into<PathBuf>, until: NaiveDate) -> Self {
        Self {
            dir: dir.into(),
            until,
            days: 21,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    pub fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    fn in_window(&self, date: NaiveDate) -> bool {
        let cutoff = self
            .until
            .checked_sub_days(Days::new(u64::from(self.days)))
            .unwrap_or(NaiveDate::MIN);
        cutoff <= date && date <= self.until
    }
}

/// `2025_06_02` or `2025-06-02`.
fn journal_date(stem: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&stem.replace('_', "-"), "%Y-%m-%d").ok()
}

#[async_trait]
impl SourceLoader for JournalDirLoader {
    fn name(&self) -> &str {
        "journals"
    }

    async fn load(&self) -> Result<SourceBatch, LoadError> {
        let Some(paths) = markdown_files(&self.dir).await? else {
            return Ok(SourceBatch::new(self.name(), vec![]));
        };

        let mut records = Vec::new();
        for path in paths {
            let Some(stem) = file_stem(&path) else {
                continue;
            };
            // Undated pages are not journals; the window check needs a date.
            let Some(date) = journal_date(&stem) else {
                debug!(file = %path.display(), "Skipping non-journal file");
                continue;
            };
            if !self.in_window(date) {
                continue;
            }
            if let Some(content) = read_limited(&path, self.max_file_bytes).await {
                records.push(RawRecord::Journal(RawJournal {
                    filename: stem,
                    content,
                }));
            }
        }

        info!(
            count = records.len(),
            days = self.days,
            until = %self.until,
            "Loaded journal pages"
        );
        Ok(SourceBatch::new(self.name(), records))
    }
}

/// Loads every note page, sorted by file name.
#[derive(Debug, Clone)]
pub struct NotesDirLoader {
    dir: PathBuf,
    /// Lowercased file stems to skip.
    excluded: Vec<String>,
    max_file_bytes: u64,
}

impl NotesDirLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            excluded: vec!["templates".into(), "file".into(), "file-path".into()],
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    pub fn with_excluded(mut self, names: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.excluded = names
            .into_iter()
            .map(|n| n.as_ref().to_lowercase())
            .collect();
        self
    }

    pub fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }
}

#[async_trait]
impl SourceLoader for NotesDirLoader {
    fn name(&self) -> &str {
        "notes"
    }

    async fn load(&self) -> Result<SourceBatch, LoadError> {
        let Some(paths) = markdown_files(&self.dir).await? else {
            return Ok(SourceBatch::new(self.name(), vec![]));
        };

        let mut records = Vec::new();
        for path in paths {
            let Some(stem) = file_stem(&path) else {
                continue;
            };
            if self.excluded.contains(&stem.to_lowercase()) {
                debug!(file = %path.display(), "Skipping excluded note");
                continue;
            }
            if let Some(content) = read_limited(&path, self.max_file_bytes).await {
                records.push(RawRecord::Note(RawNote {
                    filename: stem,
                    content,
                }));
            }
        }

        info!(count = records.len(), dir = %self.dir.display(), "Loaded notes");
        Ok(SourceBatch::new(self.name(), records))
    }
}

/// Sorted `*.md` files of `dir`, or `None` when the directory is absent.
async fn markdown_files(dir: &Path) -> Result<Option<Vec<PathBuf>>, LoadError> {
    if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
        warn!(dir = %dir.display(), "Source directory not found");
        return Ok(None);
    }

    let mut reader = tokio::fs::read_dir(dir).await.map_err(|e| LoadError::Io {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut paths = Vec::new();
    loop {
        let entry = reader.next_entry().await.map_err(|e| LoadError::Io {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        let Some(entry) = entry else { break };
        let path = entry.path();
        if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
        {
            paths.push(path);
        }
    }

    // Sort for deterministic ordering
    paths.sort();
    Ok(Some(paths))
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(String::from)
}

/// Read a file unless it exceeds `limit` bytes. Unreadable or oversize
/// files are logged and skipped.
async fn read_limited(path: &Path, limit: u64) -> Option<String> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > limit => {
            warn!(file = %path.display(), size = meta.len(), limit, "Skipped large file");
            return None;
        }
        Ok(_) => {}
        Err(e) => {
            warn!(file = %path.display(), error = %e, "Skipping unreadable file");
            return None;
        }
    }
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Some(content),
        Err(e) => {
            warn!(file = %path.display(), error = %e, "Skipping unreadable file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    fn stems(batch: &SourceBatch) -> Vec<String> {
        batch
            .records
            .iter()
            .map(|r| match r {
                RawRecord::Journal(j) => j.filename.clone(),
                RawRecord::Note(n) => n.filename.clone(),
                other => panic!("unexpected record {other:?}"),
            })
            .collect()
    }

    #[tokio::test]
    async fn journals_within_window_only() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "2025_05_01.md", "- too old");
        write(tmp.path(), "2025_05_30.md", "- in window");
        write(tmp.path(), "2025_06_02.md", "- today");
        write(tmp.path(), "2025_06_03.md", "- tomorrow");
        write(tmp.path(), "contents.md", "- not a journal");
        write(tmp.path(), "2025_06_01.txt", "- wrong extension");

        let batch = JournalDirLoader::new(tmp.path(), date(2))
            .with_days(7)
            .load()
            .await
            .unwrap();

        assert_eq!(batch.source, "journals");
        assert_eq!(stems(&batch), vec!["2025_05_30", "2025_06_02"]);
    }

    #[tokio::test]
    async fn huge_day_count_reaches_back_to_the_oldest_page() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "1900_01_01.md", "- ancient");
        write(tmp.path(), "2025_06_02.md", "- today");

        let batch = JournalDirLoader::new(tmp.path(), date(2))
            .with_days(u32::MAX)
            .load()
            .await
            .unwrap();
        assert_eq!(stems(&batch), vec!["1900_01_01", "2025_06_02"]);
    }

    #[tokio::test]
    async fn oversize_files_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "2025_06_02.md", &"x".repeat(64));
        write(tmp.path(), "2025_06_01.md", "- small");

        let batch = JournalDirLoader::new(tmp.path(), date(2))
            .with_max_file_bytes(32)
            .load()
            .await
            .unwrap();
        assert_eq!(stems(&batch), vec!["2025_06_01"]);
    }

    #[tokio::test]
    async fn notes_are_sorted_and_exclusions_apply() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "Zeta.md", "- z");
        write(tmp.path(), "Alpha.md", "alias:: A\n- a");
        write(tmp.path(), "templates.md", "- template");
        write(tmp.path(), "File.md", "- excluded case-insensitively");

        let batch = NotesDirLoader::new(tmp.path()).load().await.unwrap();
        assert_eq!(stems(&batch), vec!["Alpha", "Zeta"]);

        let RawRecord::Note(alpha) = &batch.records[0] else {
            panic!("expected note");
        };
        assert_eq!(alpha.content, "alias:: A\n- a");
    }

    #[tokio::test]
    async fn missing_directory_is_an_empty_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let gone = tmp.path().join("nope");

        let notes = NotesDirLoader::new(&gone).load().await.unwrap();
        assert!(notes.records.is_empty());

        let journals = JournalDirLoader::new(&gone, date(2)).load().await.unwrap();
        assert!(journals.records.is_empty());
    }

    #[test]
    fn journal_date_accepts_both_separators() {
        assert_eq!(journal_date("2025_06_02"), Some(date(2)));
        assert_eq!(journal_date("2025-06-02"), Some(date(2)));
        assert_eq!(journal_date("Project Alpha"), None);
    }
}
