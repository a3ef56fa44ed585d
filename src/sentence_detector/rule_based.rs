// WHY: Resource-free sentence boundaries from punctuation and capitalization,
// usable for any language and as the fallback when resources are missing

use std::ops::Range;
use tracing::debug;

use super::SentenceTokenizer;

/// Configuration for sentence boundary detection rules
#[derive(Debug, Clone)]
pub struct SentenceBoundaryRules {
    /// End punctuation characters that can terminate a sentence
    pub end_punctuation: Vec<char>,
    /// Closing quotes and brackets that may follow end punctuation
    pub closing_punctuation: Vec<char>,
    /// Characters considered opening quotes
    pub opening_quotes: Vec<char>,
    /// Characters considered opening parentheticals
    pub opening_parentheticals: Vec<char>,
}

impl Default for SentenceBoundaryRules {
    fn default() -> Self {
        Self {
            end_punctuation: vec!['.', '?', '!'],
            closing_punctuation: vec!['"', '\'', '\u{201D}', '\u{2019}', ')', ']', '\u{BB}'],
            opening_quotes: vec!['"', '\'', '\u{201C}', '\u{2018}', '\u{AB}', '\u{BF}', '\u{A1}'],
            opening_parentheticals: vec!['(', '[', '{'],
        }
    }
}

impl SentenceBoundaryRules {
    pub fn is_end_punctuation(&self, ch: char) -> bool {
        self.end_punctuation.contains(&ch)
    }

    pub fn is_closing(&self, ch: char) -> bool {
        self.closing_punctuation.contains(&ch)
    }

    /// Whether a sentence may start with this char
    pub fn opens_sentence(&self, ch: char) -> bool {
        ch.is_uppercase()
            || ch.is_numeric()
            || self.opening_quotes.contains(&ch)
            || self.opening_parentheticals.contains(&ch)
    }
}

/// Rule-based tokenizer: end punctuation (plus closers), whitespace, then a
/// capital, digit, opening quote or parenthesis; a blank line always splits
#[derive(Debug, Clone, Default)]
pub struct RuleBasedTokenizer {
    rules: SentenceBoundaryRules,
}

impl RuleBasedTokenizer {
    pub fn new(rules: SentenceBoundaryRules) -> Self {
        Self { rules }
    }

    /// If a boundary sits at `pos`, return (sentence end, scan resume position)
    fn boundary_at(&self, chars: &[char], pos: usize) -> Option<(usize, usize)> {
        let ch = chars[pos];

        if ch == '\n' {
            let mut next = pos + 1;
            while next < chars.len() && matches!(chars[next], ' ' | '\t' | '\r') {
                next += 1;
            }
            return (next < chars.len() && chars[next] == '\n').then_some((pos, next + 1));
        }

        if pos == 0 || !self.rules.is_end_punctuation(ch) {
            return None;
        }

        // Skip further end punctuation and closers: "?!", ".)", '."'
        let mut next = pos + 1;
        while next < chars.len() && (self.rules.is_end_punctuation(chars[next]) || self.rules.is_closing(chars[next])) {
            next += 1;
        }
        let end = next;

        // Must have space after punctuation
        if next >= chars.len() || !chars[next].is_whitespace() {
            return None;
        }
        while next < chars.len() && chars[next].is_whitespace() {
            next += 1;
        }

        (next < chars.len() && self.rules.opens_sentence(chars[next])).then_some((end, end))
    }
}

impl SentenceTokenizer for RuleBasedTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Range<usize>> {
        let chars: Vec<char> = text.chars().collect();
        let mut spans = Vec::new();
        let mut start = 0;
        let mut pos = 0;

        while pos < chars.len() {
            match self.boundary_at(&chars, pos) {
                Some((end, resume)) => {
                    push_trimmed(&chars, start..end, &mut spans);
                    start = end;
                    pos = resume.max(pos + 1);
                }
                None => pos += 1,
            }
        }
        push_trimmed(&chars, start..chars.len(), &mut spans);

        debug!("Rule-based tokenizer found {} sentences", spans.len());
        spans
    }
}

/// Push `range` with surrounding whitespace removed, if anything remains
pub(crate) fn push_trimmed(chars: &[char], range: Range<usize>, spans: &mut Vec<Range<usize>>) {
    let mut start = range.start;
    let mut end = range.end;
    while start < end && chars[start].is_whitespace() {
        start += 1;
    }
    while end > start && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    if start < end {
        spans.push(start..end);
    }
}
