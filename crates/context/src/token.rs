//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token. Feeds the
//! ranker's token ceiling and the per-group statistics in the document
//! metadata.

use vea_core::{Directive, Evidence};

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4)
}

/// Estimate tokens for one Evidence item including per-item overhead.
///
/// Each item costs ~4 tokens of overhead for its id, kind and source
/// reference in the rendered document.
pub fn estimate_evidence_tokens(evidence: &Evidence) -> usize {
    let overhead = 4;
    overhead + estimate_tokens(&evidence.title) + estimate_tokens(&evidence.text)
}

/// Estimate tokens for a slice of directives.
pub fn estimate_directive_tokens(directives: &[Directive]) -> usize {
    directives
        .iter()
        .map(|d| 2 + estimate_tokens(&d.raw_text))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use vea_core::EvidenceDetails;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn four_chars_is_one_token() {
        assert_eq!(estimate_tokens("test"), 1);
    }

    #[test]
    fn five_chars_rounds_up() {
        assert_eq!(estimate_tokens("hello"), 2);
    }

    #[test]
    fn hundred_chars() {
        let text = "a".repeat(100);
        assert_eq!(estimate_tokens(&text), 25);
    }

    #[test]
    fn evidence_includes_overhead() {
        let note = Evidence {
            id: "note:x".into(),
            title: "test".into(), // 1 token
            timestamp: None,
            text: "hello".into(), // 2 tokens
            tags: BTreeSet::new(),
            source_ref: "notes/x.md".into(),
            aliases_declared: vec![],
            details: EvidenceDetails::Note,
        };
        assert_eq!(estimate_evidence_tokens(&note), 7);
    }

    #[test]
    fn directives_sum() {
        let d = |text: &str| Directive {
            order: 0,
            raw_text: text.into(),
            source_id: "journal:2025-06-02".into(),
            line: 1,
            depth: 0,
        };
        assert_eq!(estimate_directive_tokens(&[d("test"), d("hello")]), 7);
        assert_eq!(estimate_directive_tokens(&[]), 0);
    }
}
