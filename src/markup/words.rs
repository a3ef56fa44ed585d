// WHY: Word spans are reported in the coordinates of the input itself, markup
// included, so callers can address words without re-parsing

use serde::{Deserialize, Serialize};

use super::tag_parser::{TagParser, Token};
use crate::position::{BytePos, OffsetTracker};

/// Half-open char span of one word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordSpan {
    pub start: usize,
    pub end: usize,
}

impl WordSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Extract words from text that may contain markup.
///
/// Known tags and script/style bodies produce no words but still advance the
/// cursor, so spans address the input string itself.
pub fn extract_words(text_or_markup: &str) -> Vec<WordSpan> {
    extract_words_with(TagParser::shared(), text_or_markup)
}

/// Extract words using a specific tag parser configuration
pub fn extract_words_with(parser: &TagParser, text_or_markup: &str) -> Vec<WordSpan> {
    let mut tracker = OffsetTracker::new(text_or_markup);
    let mut words = Vec::new();

    for token in parser.tokens(text_or_markup) {
        if let Token::Text(range) = token {
            push_segment_words(text_or_markup, range.start, range.end, &mut tracker, &mut words);
        }
    }

    words
}

/// Extract words from text known to contain no markup
pub fn extract_words_plain(text: &str) -> Vec<WordSpan> {
    let mut tracker = OffsetTracker::new(text);
    let mut words = Vec::new();
    push_segment_words(text, 0, text.len(), &mut tracker, &mut words);
    words
}

/// Push maximal non-whitespace runs of `text[start..end]` (byte range)
fn push_segment_words(
    text: &str,
    start: usize,
    end: usize,
    tracker: &mut OffsetTracker<'_>,
    words: &mut Vec<WordSpan>,
) {
    let mut word_start: Option<usize> = None;

    for (offset, ch) in text[start..end].char_indices() {
        let byte = start + offset;
        match (ch.is_whitespace(), word_start) {
            (false, None) => word_start = Some(byte),
            (true, Some(ws)) => {
                let span_start = tracker.advance_to_byte(BytePos(ws)).0;
                let span_end = tracker.advance_to_byte(BytePos(byte)).0;
                words.push(WordSpan::new(span_start, span_end));
                word_start = None;
            }
            _ => {}
        }
    }

    if let Some(ws) = word_start {
        let span_start = tracker.advance_to_byte(BytePos(ws)).0;
        let span_end = tracker.advance_to_byte(BytePos(end)).0;
        words.push(WordSpan::new(span_start, span_end));
    }
}
