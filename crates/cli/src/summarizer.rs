//! External-command summarizer.
//!
//! Pipes the context document as JSON into `sh -c <command>` and returns
//! whatever the command prints on stdout.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;
use vea_core::{ContextDocument, SummarizeError, Summarizer};

pub struct CommandSummarizer {
    command: String,
}

impl CommandSummarizer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl Summarizer for CommandSummarizer {
    fn name(&self) -> &str {
        "command"
    }

    async fn summarize(&self, document: &ContextDocument) -> Result<String, SummarizeError> {
        let payload = document
            .to_json_pretty()
            .map_err(|e| SummarizeError::Failed(format!("cannot serialize document: {e}")))?;

        let (shell, flag) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };
        debug!(command = %self.command, bytes = payload.len(), "Spawning summarizer");

        let mut child = Command::new(shell)
            .arg(flag)
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Write concurrently with reading stdout so a chatty command cannot
        // deadlock on a full pipe. Dropping stdin closes it (EOF).
        let writer = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move { stdin.write_all(payload.as_bytes()).await })
        });

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SummarizeError::Failed(format!(
                "`{}` exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }
        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                // Exited successfully without reading the whole document.
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    debug!(command = %self.command, "Summarizer closed stdin early");
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(e) => {
                    return Err(SummarizeError::Failed(format!("stdin writer failed: {e}")));
                }
            }
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;
    use vea_context::{ContextAssembler, RankedEvidence, RankedGroup};
    use vea_core::{
        ContextMode, DocumentEntry, Evidence, EvidenceDetails, EvidenceKind, TaskContext,
    };

    fn document_with_note(body: &str) -> ContextDocument {
        let task = TaskContext::daily(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        let groups = if body.is_empty() {
            vec![]
        } else {
            vec![RankedGroup {
                kind: EvidenceKind::Note,
                entries: vec![DocumentEntry {
                    evidence: Evidence {
                        id: "note:Big".into(),
                        title: "Big".into(),
                        timestamp: None,
                        text: body.into(),
                        tags: BTreeSet::new(),
                        source_ref: "notes/Big.md".into(),
                        aliases_declared: vec![],
                        details: EvidenceDetails::Note,
                    },
                    score: None,
                    protected: false,
                }],
                total: 1,
            }]
        };
        let ranked = RankedEvidence {
            mode: ContextMode::Ranked,
            groups,
            drops: vec![],
        };
        ContextAssembler::new().assemble(&task, ranked, vec![]).unwrap()
    }

    fn document() -> ContextDocument {
        document_with_note("")
    }

    #[tokio::test]
    async fn command_receives_document_on_stdin() {
        let summarizer = CommandSummarizer::new("grep -c '\"task\": \"daily\"'");
        let out = summarizer.summarize(&document()).await.unwrap();
        assert_eq!(out.trim(), "1");
    }

    #[tokio::test]
    async fn failing_command_is_an_error() {
        let summarizer = CommandSummarizer::new("echo boom >&2; exit 3");
        let err = summarizer.summarize(&document()).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn command_that_ignores_stdin_still_succeeds() {
        let doc = document_with_note(&"x".repeat(300_000));
        assert!(doc.to_json_pretty().unwrap().len() > 64 * 1024);

        let summarizer = CommandSummarizer::new("echo brief");
        let out = summarizer.summarize(&doc).await.unwrap();
        assert_eq!(out.trim(), "brief");
    }
}
