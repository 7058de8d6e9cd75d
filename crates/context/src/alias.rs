//! Alias graph: canonical names for `[[…]]` cross-references.
//!
//! Built in one pass over the note Evidence, closed transitively, and only
//! then used to rewrite text. Keys are case- and whitespace-folded.
//!
//! Nodes are note names and declared aliases. Edges point from an alias to
//! the note that declared it; when a note declares another note's name as
//! an alias, that note's node gets the edge too, so chains resolve through
//! to the last note. Cycles resolve to the member registered first.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};
use vea_core::{EvidenceKind, EvidenceSet, RunWarning};

use crate::text::{self, WIKI_LINK};

#[derive(Debug, Clone, Default)]
pub struct AliasGraph {
    /// Folded key → canonical display name, transitively closed.
    canonical: HashMap<String, String>,
}

/// Build-phase state; discarded once the closure is computed.
#[derive(Default)]
struct Builder {
    /// Registration order of every key (note names and aliases).
    order: Vec<String>,
    rank: HashMap<String, usize>,
    /// Note key → display name.
    notes: HashMap<String, String>,
    /// Alias key → declaring note key (first declaration wins).
    declared: HashMap<String, (String, String)>,
    /// Outgoing edge per key.
    next: HashMap<String, String>,
}

impl Builder {
    fn register(&mut self, key: &str) {
        if !self.rank.contains_key(key) {
            self.rank.insert(key.to_string(), self.order.len());
            self.order.push(key.to_string());
        }
    }

    /// Follow edges from `start` to a terminal note, or to the first-ranked
    /// member of the cycle the walk runs into.
    fn resolve(&self, start: &str, memo: &HashMap<String, String>) -> Option<String> {
        let mut path: Vec<&str> = Vec::new();
        let mut current = start;
        loop {
            if let Some(done) = memo.get(current) {
                return Some(done.clone());
            }
            if let Some(pos) = path.iter().position(|k| *k == current) {
                let cycle = &path[pos..];
                let head = cycle
                    .iter()
                    .min_by_key(|k| self.rank.get(**k).copied().unwrap_or(usize::MAX))?;
                return self.notes.get(*head).cloned();
            }
            path.push(current);
            match self.next.get(current) {
                Some(target) => current = target,
                None => return self.notes.get(current).cloned(),
            }
        }
    }
}

impl AliasGraph {
    /// Build the graph from every note in `evidence`, in iteration order.
    ///
    /// Returns the graph and one `AliasConflict` per alias claimed by a
    /// second note.
    pub fn build(evidence: &EvidenceSet) -> (Self, Vec<RunWarning>) {
        let mut b = Builder::default();
        let mut warnings = Vec::new();
        let notes: Vec<_> = evidence.of_kind(EvidenceKind::Note).collect();

        // Note names first, so an alias naming a later note still finds it.
        for note in &notes {
            let key = text::normalize_key(&note.title);
            if key.is_empty() {
                continue;
            }
            match b.notes.get(&key) {
                Some(kept) if *kept != note.title => {
                    warnings.push(conflict(&note.title, kept, &note.title));
                }
                Some(_) => {}
                None => {
                    b.register(&key);
                    b.notes.insert(key, note.title.clone());
                }
            }
        }

        for note in &notes {
            let owner = text::normalize_key(&note.title);
            if b.notes.get(&owner) != Some(&note.title) {
                // Lost a name conflict; its aliases would point nowhere.
                continue;
            }
            for alias in &note.aliases_declared {
                let key = text::normalize_key(alias);
                if key.is_empty() || key == owner {
                    continue;
                }
                if let Some((kept_owner, kept_name)) = b.declared.get(&key) {
                    if *kept_owner != owner {
                        warnings.push(conflict(alias, kept_name, &note.title));
                    }
                    continue;
                }
                b.register(&key);
                b.declared
                    .insert(key.clone(), (owner.clone(), note.title.clone()));
                b.next.insert(key, owner.clone());
            }
        }

        for w in &warnings {
            warn!(warning = %w, "Alias conflict");
        }

        let mut canonical: HashMap<String, String> = HashMap::new();
        for key in &b.order {
            if let Some(name) = b.resolve(key, &canonical) {
                canonical.insert(key.clone(), name);
            }
        }
        debug!(
            notes = b.notes.len(),
            aliases = b.declared.len(),
            "Alias graph built"
        );

        (Self { canonical }, warnings)
    }

    /// Canonical name for `name`, if the graph knows it.
    pub fn canonical(&self, name: &str) -> Option<&str> {
        self.canonical
            .get(&text::normalize_key(name))
            .map(String::as_str)
    }

    /// Lexical terms of every known note name and alias.
    pub fn terms(&self) -> BTreeSet<String> {
        self.canonical.keys().flat_map(|key| text::terms(key)).collect()
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Rewrite every known `[[name]]` in `input` to `[[Canonical]]`.
    /// Unknown references are left as written.
    pub fn rewrite(&self, input: &str) -> String {
        WIKI_LINK
            .replace_all(input, |caps: &regex_lite::Captures<'_>| {
                let whole = caps.get(0).map_or("", |m| m.as_str());
                let name = caps.get(1).map_or("", |m| m.as_str());
                match self.canonical(name) {
                    Some(canonical) if canonical != name => format!("[[{canonical}]]"),
                    _ => whole.to_string(),
                }
            })
            .into_owned()
    }

    /// Resolve phase: rewrite the text of every Evidence item in place.
    /// Returns how many items changed.
    pub fn resolve(&self, evidence: &mut EvidenceSet) -> usize {
        if self.is_empty() {
            return 0;
        }
        let changed = evidence.rewrite_text(|item| {
            if item.text.contains("[[") {
                Some(self.rewrite(&item.text))
            } else {
                None
            }
        });
        debug!(changed, "Cross-references canonicalized");
        changed
    }
}

fn conflict(alias: &str, kept: &str, rejected: &str) -> RunWarning {
    RunWarning::AliasConflict {
        alias: alias.to_string(),
        kept: kept.to_string(),
        rejected: rejected.to_string(),
    }
}
