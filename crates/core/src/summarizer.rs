//! Summarizer trait: the boundary to the external text generator.
//!
//! The core hands over a finished [`ContextDocument`] and returns whatever
//! text comes back; it never inspects or validates it.

use crate::document::ContextDocument;
use crate::error::SummarizeError;
use async_trait::async_trait;

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// The summarizer name (e.g., "command", "scripted").
    fn name(&self) -> &str;

    /// Turn a context document into a brief.
    async fn summarize(&self, document: &ContextDocument) -> Result<String, SummarizeError>;
}
