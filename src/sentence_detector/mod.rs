// WHY: Sentence extraction with swappable tokenizer backends and a dense
// word-index to sentence-index map built by a two-pointer scan

use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::debug;

pub mod abbreviations;
pub mod rule_based;
pub mod statistical;

pub use abbreviations::{LanguageResources, ResourceRegistry};
pub use rule_based::{RuleBasedTokenizer, SentenceBoundaryRules};
pub use statistical::StatisticalTokenizer;

use crate::markup::{mask_tags, TagParser, WordSpan};
use crate::normalization::collapse_whitespace;
use crate::position::{CharIndex, CharPos};

/// Sentence boundary backend
pub trait SentenceTokenizer: Send + Sync {
    /// Sentence spans as half-open char ranges: ordered, disjoint, and
    /// trimmed so they start and end on non-whitespace
    fn tokenize(&self, text: &str) -> Vec<Range<usize>>;
}

/// Which tokenizer backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerChoice {
    /// Abbreviation-aware tokenizer backed by per-language resources
    #[default]
    Statistical,
    /// Punctuation and capitalization rules only
    RuleBased,
}

/// One sentence: normalized text plus its char span in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Sentences of one text and the sentence index of every word
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceMap {
    pub sentences: Vec<Sentence>,
    /// `word_to_sentence[i]` is the sentence holding word `i`
    pub word_to_sentence: Vec<usize>,
}

impl SentenceMap {
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Sentence containing the given word
    pub fn sentence_of(&self, word_index: usize) -> Option<&Sentence> {
        self.word_to_sentence
            .get(word_index)
            .and_then(|&s| self.sentences.get(s))
    }
}

/// Pick a tokenizer, falling back to rules when the language has no resources
pub fn tokenizer_for<'r>(
    language: &str,
    choice: TokenizerChoice,
    registry: &'r ResourceRegistry,
) -> Box<dyn SentenceTokenizer + 'r> {
    match choice {
        TokenizerChoice::RuleBased => Box::new(RuleBasedTokenizer::default()),
        TokenizerChoice::Statistical => match registry.get(language) {
            Some(resources) => Box::new(StatisticalTokenizer::new(resources)),
            None => {
                debug!("No sentence resources for {:?}, using rule-based tokenizer", language);
                Box::new(RuleBasedTokenizer::default())
            }
        },
    }
}

/// Split plain text into sentences and map every word to its sentence
pub fn break_into_sentences(
    text: &str,
    words: &[WordSpan],
    language: &str,
    choice: TokenizerChoice,
    registry: &ResourceRegistry,
) -> SentenceMap {
    let tokenizer = tokenizer_for(language, choice, registry);
    let index = CharIndex::new(text);
    let spans = tokenizer.tokenize(text);

    let sentences = spans
        .into_iter()
        .filter_map(|span| {
            let raw = slice(text, &index, &span);
            let normalized = collapse_whitespace(raw);
            (!normalized.is_empty()).then(|| Sentence { text: normalized, start: span.start, end: span.end })
        })
        .collect();

    assemble(sentences, words, || (collapse_whitespace(text), index.char_len()))
}

/// Sentence extraction over markup: tags are masked to spaces so tokenizer
/// offsets line up with markup word spans, and sentence text is taken from
/// the cleaned markup slice
pub fn break_markup_into_sentences(
    markup: &str,
    words: &[WordSpan],
    language: &str,
    choice: TokenizerChoice,
    registry: &ResourceRegistry,
) -> SentenceMap {
    break_markup_into_sentences_with(TagParser::shared(), markup, words, language, choice, registry)
}

/// Like [`break_markup_into_sentences`] with a custom tag parser
pub fn break_markup_into_sentences_with(
    parser: &TagParser,
    markup: &str,
    words: &[WordSpan],
    language: &str,
    choice: TokenizerChoice,
    registry: &ResourceRegistry,
) -> SentenceMap {
    let parsed = parser.parse(markup);
    let masked = mask_tags(markup, &parsed.tags);
    let tokenizer = tokenizer_for(language, choice, registry);
    let index = CharIndex::new(markup);

    let sentences = tokenizer
        .tokenize(&masked)
        .into_iter()
        .filter_map(|span| {
            let raw = slice(markup, &index, &span);
            let normalized = collapse_whitespace(&parser.parse(raw).text);
            (!normalized.is_empty()).then(|| Sentence { text: normalized, start: span.start, end: span.end })
        })
        .collect();

    assemble(sentences, words, || (collapse_whitespace(&parsed.text), index.char_len()))
}

fn slice<'t>(text: &'t str, index: &CharIndex, span: &Range<usize>) -> &'t str {
    let start = index.byte_of(CharPos(span.start)).0;
    let end = index.byte_of(CharPos(span.end)).0;
    &text[start..end]
}

/// Add the whole-text fallback sentence if needed and build the word map
fn assemble(
    mut sentences: Vec<Sentence>,
    words: &[WordSpan],
    whole_text: impl FnOnce() -> (String, usize),
) -> SentenceMap {
    if sentences.is_empty() && !words.is_empty() {
        let (text, len) = whole_text();
        sentences.push(Sentence { text, start: 0, end: len });
    }

    let word_to_sentence = map_words_to_sentences(words, &sentences);
    SentenceMap { sentences, word_to_sentence }
}

/// Two-pointer scan: move to the next sentence while the word starts at or
/// after the current sentence's end; words past the last sentence clamp to it
pub fn map_words_to_sentences(words: &[WordSpan], sentences: &[Sentence]) -> Vec<usize> {
    if sentences.is_empty() {
        return Vec::new();
    }

    let last = sentences.len() - 1;
    let mut cursor = 0;
    words
        .iter()
        .map(|word| {
            while cursor < last && word.start >= sentences[cursor].end {
                cursor += 1;
            }
            cursor
        })
        .collect()
}

/// Convenience for plain text: extract words and sentences together
pub fn sentences_of(text: &str, language: &str, choice: TokenizerChoice) -> (Vec<WordSpan>, SentenceMap) {
    let words = crate::markup::extract_words_plain(text);
    let map = break_into_sentences(text, &words, language, choice, ResourceRegistry::shared());
    (words, map)
}

/// Sentence strings of a markup fragment
pub fn sentence_texts(markup: &str, language: &str, choice: TokenizerChoice) -> Vec<String> {
    let words = crate::markup::extract_words(markup);
    break_markup_into_sentences(markup, &words, language, choice, ResourceRegistry::shared())
        .sentences
        .into_iter()
        .map(|s| s.text)
        .collect()
}
