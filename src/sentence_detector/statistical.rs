// WHY: Sentence ends are decided per whitespace token; seed and learned
// abbreviations plus initials keep "Mr." and "J." from closing sentences

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use tracing::debug;

use super::abbreviations::LanguageResources;
use super::rule_based::SentenceBoundaryRules;
use super::SentenceTokenizer;

/// Minimum period-final occurrences before a type is learned
const MIN_LEARNED_OCCURRENCES: usize = 3;

/// Longest type (in chars) that may be learned without an internal period
const MAX_LEARNED_LEN: usize = 4;

pub struct StatisticalTokenizer<'r> {
    resources: &'r LanguageResources,
    rules: SentenceBoundaryRules,
}

#[derive(Default)]
struct TypeCounts {
    with_period: usize,
    without_period: usize,
}

impl<'r> StatisticalTokenizer<'r> {
    pub fn new(resources: &'r LanguageResources) -> Self {
        Self {
            resources,
            rules: SentenceBoundaryRules::default(),
        }
    }

    /// Token with leading openers and trailing closers removed
    fn core<'t>(&self, token: &'t str) -> &'t str {
        token
            .trim_start_matches(|c: char| {
                self.rules.opening_quotes.contains(&c) || self.rules.opening_parentheticals.contains(&c)
            })
            .trim_end_matches(|c: char| self.rules.is_closing(c))
    }

    /// Abbreviation types found in this text: any type with an internal
    /// period, or a short type seen repeatedly with a trailing period and
    /// never without one
    pub fn learn_abbreviations(&self, tokens: &[&str]) -> HashSet<String> {
        let mut counts: HashMap<String, TypeCounts> = HashMap::new();

        for token in tokens {
            let core = self.core(token);
            if let Some(stem) = core.strip_suffix('.') {
                if stem.is_empty() || stem.ends_with('.') || !stem.chars().any(char::is_alphabetic) {
                    continue;
                }
                counts.entry(stem.to_lowercase()).or_default().with_period += 1;
            } else {
                let stem = core.trim_end_matches(|c: char| c.is_ascii_punctuation());
                if !stem.is_empty() {
                    counts.entry(stem.to_lowercase()).or_default().without_period += 1;
                }
            }
        }

        let learned: HashSet<String> = counts
            .into_iter()
            .filter(|(stem, c)| {
                c.with_period > 0
                    && (stem.contains('.')
                        || (c.with_period >= MIN_LEARNED_OCCURRENCES
                            && c.without_period == 0
                            && stem.chars().count() <= MAX_LEARNED_LEN))
            })
            .map(|(stem, _)| stem)
            .collect();

        if !learned.is_empty() {
            debug!("Learned {} abbreviation types from text", learned.len());
        }
        learned
    }

    fn ends_sentence(&self, token: &str, next: &str, learned: &HashSet<String>) -> bool {
        let core = self.core(token);
        let Some(last) = core.chars().last() else {
            return false;
        };
        if !self.rules.is_end_punctuation(last) {
            return false;
        }
        let Some(next_first) = next.chars().next() else {
            return false;
        };
        if next_first.is_lowercase() {
            return false;
        }
        if last != '.' {
            return true;
        }

        let stem = core.trim_end_matches('.');
        // "..." on its own, or punctuation after a closing tag
        if stem.is_empty() || core.ends_with("..") {
            return self.rules.opens_sentence(next_first);
        }

        let mut letters = stem.chars();
        let is_initial = matches!((letters.next(), letters.next()), (Some(c), None) if c.is_alphabetic() && c.is_uppercase());
        if is_initial {
            return false;
        }

        let key = stem.to_lowercase();
        !(self.resources.is_abbreviation(&key) || learned.contains(&key))
    }
}

/// A whitespace-delimited token
struct Token<'t> {
    /// Char range in the text
    range: Range<usize>,
    text: &'t str,
    /// Line breaks between the previous token and this one
    newlines_before: usize,
}

fn split_tokens(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut current: Option<(usize, usize)> = None;
    let mut newlines = 0;
    let mut char_pos = 0;

    for (byte, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some((start_char, start_byte)) = current.take() {
                tokens.push(Token { range: start_char..char_pos, text: &text[start_byte..byte], newlines_before: newlines });
                newlines = 0;
            }
            if ch == '\n' {
                newlines += 1;
            }
        } else if current.is_none() {
            current = Some((char_pos, byte));
        }
        char_pos += 1;
    }
    if let Some((start_char, start_byte)) = current {
        tokens.push(Token { range: start_char..char_pos, text: &text[start_byte..], newlines_before: newlines });
    }
    tokens
}

impl<'r> SentenceTokenizer for StatisticalTokenizer<'r> {
    fn tokenize(&self, text: &str) -> Vec<Range<usize>> {
        let tokens = split_tokens(text);
        let words: Vec<&str> = tokens.iter().map(|t| t.text).collect();
        let learned = self.learn_abbreviations(&words);

        let mut spans = Vec::new();
        let Some(first) = tokens.first() else {
            return spans;
        };
        let mut start = first.range.start;

        for pair in tokens.windows(2) {
            let (token, next) = (&pair[0], &pair[1]);
            if next.newlines_before >= 2 || self.ends_sentence(token.text, next.text, &learned) {
                spans.push(start..token.range.end);
                start = next.range.start;
            }
        }
        if let Some(last) = tokens.last() {
            spans.push(start..last.range.end);
        }

        debug!("Statistical tokenizer ({}) found {} sentences", self.resources.language, spans.len());
        spans
    }
}
