//! Plain-text helpers shared by the pipeline stages.
//!
//! Outline handling, marker detection, cross-reference scanning and the
//! term extraction used for lexical overlap.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex_lite::Regex;

/// `[[Name]]` cross-reference token.
pub static WIKI_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]]+)\]\]").unwrap());

/// Google Meet joining-info block appended to calendar descriptions.
pub static MEET_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)-::~:~::~:~:.*?-::~:~::~:~:.*?-::~:~::~:~::-").unwrap()
});

/// "On Mon, 2 Jun 2025 at 09:00, Someone <a@b.c> wrote:"
pub static REPLY_ATTRIBUTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^On .+ wrote:$").unwrap());

/// Slack user mention `<@U123>` or `<@U123|name>`.
pub static SLACK_USER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@([A-Z0-9]+)(?:\|([^>]+))?>").unwrap());

/// Slack channel mention `<#C123|general>`.
pub static SLACK_CHANNEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<#[A-Z0-9]+\|([^>]+)>").unwrap());

/// Slack user-group mention `<!subteam^S123|@team>`.
pub static SLACK_SUBTEAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!subteam\^[A-Z0-9]+\|@?([^>]+)>").unwrap());

/// Slack special mention `<!here>`, `<!channel>`.
pub static SLACK_SPECIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!([a-z]+)(?:\|[^>]*)?>").unwrap());

/// Words that never count towards lexical overlap.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "if", "of", "to", "in", "for", "with", "on", "at", "by",
    "from", "as", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do",
    "does", "did", "this", "that", "these", "those", "i", "me", "my", "we", "our", "you", "he",
    "she", "it", "they", "them", "their", "not",
];

const ZERO_WIDTH: &[char] = &['\u{200b}', '\u{200c}', '\u{200d}', '\u{feff}', '\u{a0}'];

/// Case- and whitespace-folded lookup key for names and aliases.
pub fn normalize_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Outline depth of a raw line: one per tab, one per two spaces.
fn raw_depth(line: &str) -> usize {
    let mut tabs = 0;
    let mut spaces = 0;
    for c in line.chars() {
        match c {
            '\t' => tabs += 1,
            ' ' => spaces += 1,
            _ => break,
        }
    }
    tabs + spaces / 2
}

/// Depth of an already-normalized line (two spaces per level).
pub fn depth_of(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ').count() / 2
}

/// Normalize outline-structured text.
///
/// Indentation becomes two spaces per depth, Logseq `collapsed::` property
/// lines and leading quote markers are removed, trailing whitespace and
/// trailing blank lines are dropped.
pub fn normalize_outline(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        let content = raw.trim();
        if content.starts_with("collapsed::") {
            continue;
        }
        let content = strip_quote_marker(content);
        if content.is_empty() {
            lines.push(String::new());
            continue;
        }
        lines.push(format!("{}{}", "  ".repeat(raw_depth(raw)), content));
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// `> quoted` → `quoted`, also after a list marker (`- > quoted`).
fn strip_quote_marker(content: &str) -> String {
    if let Some(rest) = content.strip_prefix('>') {
        return rest.trim_start().to_string();
    }
    if let Some((marker, rest)) = split_list_marker(content) {
        if let Some(quoted) = rest.strip_prefix('>') {
            return format!("{marker}{}", quoted.trim_start());
        }
    }
    content.to_string()
}

/// Split a leading list marker (`-`, `*`, `+`, `1.`, `1)`) and the
/// following space off a trimmed line.
fn split_list_marker(content: &str) -> Option<(&str, &str)> {
    let bytes = content.as_bytes();
    let marker_len = match bytes.first()? {
        b'-' | b'*' | b'+' => 1,
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            match bytes.get(digits) {
                Some(b'.') | Some(b')') => digits + 1,
                _ => return None,
            }
        }
        _ => return None,
    };
    match content[marker_len..].chars().next() {
        None => Some((&content[..marker_len], "")),
        Some(c) if c.is_whitespace() => {
            let rest = content[marker_len..].trim_start();
            let split = content.len() - rest.len();
            Some((&content[..split], rest))
        }
        Some(_) => None,
    }
}

/// The trimmed line with any list marker removed.
pub fn strip_list_marker(line: &str) -> &str {
    let content = line.trim();
    match split_list_marker(content) {
        Some((_, rest)) => rest,
        None => content,
    }
}

/// Replace zero-width and non-breaking space characters with plain spaces.
pub fn strip_zero_width(text: &str) -> String {
    text.chars()
        .map(|c| if ZERO_WIDTH.contains(&c) { ' ' } else { c })
        .collect()
}

/// Collapse runs of blank lines into one and trim the result.
pub fn collapse_blank_lines(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.is_empty() && out.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

/// Truncate to `limit` characters, appending `...` when shortened.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Marker tags found in `text`: words from `vocabulary` (already
/// lowercased), matched case-insensitively with an optional leading `#`.
pub fn collect_markers(text: &str, vocabulary: &[String]) -> BTreeSet<String> {
    text.split(|c: char| !(c.is_alphanumeric() || matches!(c, '#' | '-' | '_')))
        .map(|word| word.trim_start_matches('#').to_lowercase())
        .filter(|word| !word.is_empty() && vocabulary.iter().any(|m| m == word))
        .collect()
}

/// Distinctive terms: lowercase words of two or more characters that are
/// neither stopwords nor pure numbers.
pub fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2 && !w.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Strip one `[[…]]` wrapper, if present.
pub fn unwrap_link(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .strip_prefix("[[")
        .and_then(|v| v.strip_suffix("]]"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_folds_case_and_whitespace() {
        assert_eq!(normalize_key("  Project   Alpha "), "project alpha");
    }

    #[test]
    fn outline_uses_two_spaces_per_depth() {
        let text = "- top\n\t- child\n\t\t- grandchild\n    - four spaces\n";
        assert_eq!(
            normalize_outline(text),
            "- top\n  - child\n    - grandchild\n    - four spaces"
        );
    }

    #[test]
    fn outline_drops_collapsed_and_quotes() {
        let text = "- parent\n  collapsed:: true\n\t- > quoted child\n> plain quote";
        assert_eq!(normalize_outline(text), "- parent\n  - quoted child\nplain quote");
    }

    #[test]
    fn list_markers_are_stripped() {
        assert_eq!(strip_list_marker("  - Vea do A"), "Vea do A");
        assert_eq!(strip_list_marker("12. Vea do B"), "Vea do B");
        assert_eq!(strip_list_marker("* item"), "item");
        assert_eq!(strip_list_marker("-not a marker"), "-not a marker");
        assert_eq!(strip_list_marker("-"), "");
    }

    #[test]
    fn markers_are_case_insensitive_with_optional_hash() {
        let vocab = vec!["urgent".to_string(), "asap".to_string()];
        let tags = collect_markers("Reply #URGENT to Ana, asap please. Not urgently.", &vocab);
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["asap", "urgent"]);
    }

    #[test]
    fn terms_skip_stopwords_and_numbers() {
        let t = terms("The roadmap for Q3 in 2025 and the Roadmap review");
        assert!(t.contains("roadmap"));
        assert!(t.contains("q3"));
        assert!(t.contains("review"));
        assert!(!t.contains("the"));
        assert!(!t.contains("2025"));
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("héllo world", 5), "héllo...");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn blank_runs_collapse() {
        assert_eq!(collapse_blank_lines("a\n\n\n\nb\n\n"), "a\n\nb");
    }

    #[test]
    fn unwrap_strips_one_link() {
        assert_eq!(unwrap_link(" [[Alpha]] "), "Alpha");
        assert_eq!(unwrap_link("Beta"), "Beta");
    }

    #[test]
    fn meet_block_is_removed() {
        let desc = "Agenda\n-::~:~::~:~:~:~:~::-\nJoin with Google Meet\n-::~:~::~:~:~:~:~::-\nmeet.google.com\n-::~:~::~:~::-";
        let cleaned = MEET_BLOCK.replace_all(desc, "");
        assert_eq!(cleaned.trim(), "Agenda");
    }
}
