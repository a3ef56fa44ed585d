// WHY: Boundary pattern library kept apart from the paging loop so the
// priority order and the individual patterns can be tested on their own

use anyhow::{Context, Result};
use regex_automata::{meta::Regex, Input};
use std::ops::Range;

/// Kind of page boundary, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    /// One or more blank lines
    Paragraph,
    /// Word character + terminal punctuation + whitespace
    Sentence,
    /// End of any word
    Word,
}

/// Compositional pattern components
const PARAGRAPH_PATTERN: &str = r"\r?\n(?:[ \t]*\r?\n)+";
const SENTENCE_PATTERN: &str = r#"\w[.!?]+["'\u{201D}\u{2019}\)\]]*\s"#;
const WORD_PATTERN: &str = r"\S(?:\s|\z)";

/// A boundary candidate: the cut position is the match end with trailing
/// whitespace removed, so separators start the next page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub kind: BoundaryKind,
    /// Byte offset of the cut
    pub cut: usize,
}

/// Ordered boundary patterns
pub struct BoundaryPatterns {
    patterns: Vec<(BoundaryKind, Regex)>,
}

impl BoundaryPatterns {
    /// Compile the default paragraph > sentence > word library
    pub fn new() -> Result<Self> {
        let patterns = vec![
            (BoundaryKind::Paragraph, PARAGRAPH_PATTERN),
            (BoundaryKind::Sentence, SENTENCE_PATTERN),
            (BoundaryKind::Word, WORD_PATTERN),
        ];

        let mut compiled = Vec::with_capacity(patterns.len());
        for (kind, pattern) in patterns {
            let regex = Regex::new(pattern)
                .with_context(|| format!("invalid {kind:?} boundary pattern: {pattern}"))?;
            compiled.push((kind, regex));
        }

        Ok(Self { patterns: compiled })
    }

    /// All cuts of one boundary kind whose match starts inside `search` (byte range)
    pub fn cuts(&self, kind: BoundaryKind, haystack: &str, search: Range<usize>) -> Vec<Boundary> {
        let Some((_, regex)) = self.patterns.iter().find(|(k, _)| *k == kind) else {
            return Vec::new();
        };

        let input = Input::new(haystack).range(search);
        regex
            .find_iter(input)
            .map(|m| {
                let matched = &haystack[m.start()..m.end()];
                Boundary {
                    kind,
                    cut: m.start() + matched.trim_end().len(),
                }
            })
            .collect()
    }

    /// Pick the best cut, trying each kind in priority order.
    ///
    /// `accept` decides whether a cut lies inside the window and `distance`
    /// scores it; the first kind with any accepted cut wins, and within it the
    /// smallest distance wins with the earliest match taking ties.
    pub fn best_cut(
        &self,
        haystack: &str,
        search: Range<usize>,
        accept: impl Fn(usize) -> bool,
        distance: impl Fn(usize) -> f64,
    ) -> Option<Boundary> {
        for (kind, _) in &self.patterns {
            let mut best: Option<(Boundary, f64)> = None;
            for boundary in self.cuts(*kind, haystack, search.clone()) {
                if !accept(boundary.cut) {
                    continue;
                }
                let d = distance(boundary.cut);
                if best.map_or(true, |(_, best_d)| d < best_d) {
                    best = Some((boundary, d));
                }
            }
            if let Some((boundary, _)) = best {
                return Some(boundary);
            }
        }
        None
    }
}
