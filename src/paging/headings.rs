// WHY: Heading templates are data built from a configurable vocabulary, so the
// table can be tested without the paging loop

use anyhow::{Context, Result};
use regex_automata::meta::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::markup::{extract_words_with, parse_tags, TagParser};
use crate::normalization::collapse_whitespace;
use crate::position::{BytePos, OffsetTracker};

/// Default minimum distance in chars between two kept headings
pub const DEFAULT_CHAPTER_HEADER_DISTANCE: usize = 300;

/// Where a heading sits: `page:char_offset:word_index`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingLocation {
    pub page: usize,
    pub offset: usize,
    pub word_index: usize,
}

impl fmt::Display for HeadingLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.page, self.offset, self.word_index)
    }
}

/// A detected chapter heading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub title: String,
    pub location: HeadingLocation,
}

impl Heading {
    /// Serialized locator string
    pub fn locator(&self) -> String {
        self.location.to_string()
    }
}

/// Vocabulary the heading templates are built from.
///
/// Keywords and number words are regex fragments matched case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingPatterns {
    pub keywords: Vec<String>,
    pub cardinals: Vec<String>,
    pub ordinals: Vec<String>,
    /// Recognize lines holding nothing but a numeral between blank lines
    pub bare_numerals: bool,
    /// Longest text allowed after the enumerator on a heading line
    pub max_title_len: usize,
}

impl Default for HeadingPatterns {
    fn default() -> Self {
        let words = |list: &[&str]| list.iter().map(|w| w.to_string()).collect();
        Self {
            keywords: words(&[
                "chapter", "book", "part", "chapitre", "livre", "cap[ií]tulo", "capitolo", "libro",
                "kapitel", "buch", "teil", "hoofdstuk", "глава", "часть",
            ]),
            cardinals: words(&[
                "seventeen", "thirteen", "fourteen", "eighteen", "nineteen", "fifteen", "sixteen",
                "twelve", "eleven", "twenty", "three", "seven", "eight", "four", "five", "nine",
                "one", "two", "six", "ten",
            ]),
            ordinals: words(&[
                "seventeenth", "thirteenth", "fourteenth", "eighteenth", "nineteenth", "fifteenth",
                "sixteenth", "twentieth", "eleventh", "twelfth", "seventh", "second", "fourth",
                "eighth", "third", "fifth", "sixth", "ninth", "tenth", "first", "last",
            ]),
            bare_numerals: true,
            max_title_len: 80,
        }
    }
}

impl HeadingPatterns {
    /// Build the ordered template list
    pub fn templates(&self) -> Vec<String> {
        let keywords = self.keywords.join("|");
        let cardinals = self.cardinals.join("|");
        let ordinals = self.ordinals.join("|");
        let max = self.max_title_len;

        // Optional markup in front of the heading text, e.g. <h2 class="x">
        let lead = r"^[ \t]*(?:<[^>\n]*>[ \t]*)*";
        let enumerator = format!(r"(?:\d+|[ivxlcdm]+|{cardinals}|{ordinals}|the[ \t]+(?:{ordinals}))");

        let mut templates = vec![
            // CHAPTER XII. Title / Kapitel 3 / Book the First
            format!(r"(?im){lead}(?P<h>(?:{keywords})\.?[ \t]+{enumerator}\b[^\n]{{0,{max}}})$"),
            // The First Chapter
            format!(r"(?im){lead}(?P<h>(?:the[ \t]+)?(?:{ordinals})[ \t]+(?:{keywords})\b[^\n]{{0,{max}}})$"),
        ];

        if self.bare_numerals {
            // A numeral alone on its line between blank lines; roman numerals upper-case only
            templates.push(
                r"(?m)(?:\A|\n[ \t\r]*\n)[ \t]*(?:<[^>\n]*>[ \t]*)*(?P<h>(?:\d{1,3}|[IVXLC]{1,7})\.?)[ \t]*(?:<[^>\n]*>[ \t]*)*(?:\r?\n[ \t\r]*\n|\s*\z)"
                    .to_string(),
            );
        }

        templates
    }

    /// Compile the templates; an invalid fragment is a configuration error
    pub fn compile(&self) -> Result<Vec<Regex>> {
        self.templates()
            .iter()
            .map(|template| {
                Regex::new(template).with_context(|| format!("invalid heading template: {template}"))
            })
            .collect()
    }
}

/// Heading detector with compiled templates
pub struct HeadingDetector {
    templates: Vec<Regex>,
    min_distance: usize,
}

impl HeadingDetector {
    pub fn new(patterns: &HeadingPatterns, min_distance: usize) -> Result<Self> {
        let templates = patterns.compile()?;
        debug!("Compiled {} heading templates", templates.len());
        Ok(Self { templates, min_distance })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(&HeadingPatterns::default(), DEFAULT_CHAPTER_HEADER_DISTANCE)
    }

    /// Detect headings in one page's text.
    ///
    /// Offsets are char offsets into `page_text`; the word index counts words
    /// of `page_text` (markup-aware) that start before the heading.
    pub fn detect_headings(&self, page_text: &str, page_number: usize) -> Vec<Heading> {
        self.detect_headings_with(TagParser::shared(), page_text, page_number)
    }

    /// Like [`detect_headings`](Self::detect_headings), counting words with a custom tag parser
    pub fn detect_headings_with(&self, parser: &TagParser, page_text: &str, page_number: usize) -> Vec<Heading> {
        self.detect_headings_after(parser, page_text, page_number, None)
    }

    /// Minimum char distance between consecutive kept headings
    pub fn min_distance(&self) -> usize {
        self.min_distance
    }

    /// Detect headings on a page that follows earlier pages.
    ///
    /// `since_previous` is the char distance from the last heading kept on
    /// an earlier page to the start of `page_text`, so spacing is enforced
    /// across page boundaries.
    pub fn detect_headings_after(
        &self,
        parser: &TagParser,
        page_text: &str,
        page_number: usize,
        since_previous: Option<usize>,
    ) -> Vec<Heading> {
        // (byte offset, template order, title)
        let mut found: Vec<(usize, usize, String)> = Vec::new();

        for (order, template) in self.templates.iter().enumerate() {
            for caps in template.captures_iter(page_text) {
                let Some(span) = caps.get_group_by_name("h") else {
                    continue;
                };
                let title = fold_title(&page_text[span.start..span.end]);
                if !title.is_empty() {
                    found.push((span.start, order, title));
                }
            }
        }

        found.sort_by_key(|(offset, order, _)| (*offset, *order));
        found.dedup_by_key(|(offset, _, _)| *offset);

        let words = extract_words_with(parser, page_text);
        let mut tracker = OffsetTracker::new(page_text);
        let mut headings: Vec<Heading> = Vec::new();

        for (byte_offset, _, title) in found {
            let offset = tracker.advance_to_byte(BytePos(byte_offset)).0;

            let gap = match (headings.last(), since_previous) {
                (Some(previous), _) => Some(offset - previous.location.offset),
                (None, Some(since)) => Some(since + offset),
                (None, None) => None,
            };
            if gap.is_some_and(|gap| gap <= self.min_distance) {
                debug!("Dropping heading {:?} at {}: too close to previous", title, offset);
                continue;
            }

            let word_index = words.partition_point(|w| w.start < offset);
            headings.push(Heading {
                title,
                location: HeadingLocation { page: page_number, offset, word_index },
            });
        }

        headings
    }
}

/// Fold markup line breaks and newlines to spaces, drop remaining tags, trim
fn fold_title(raw: &str) -> String {
    let mut folded = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(idx) = rest.find('<') {
        folded.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        let close = tail.find('>');
        let is_break = close.is_some_and(|c| {
            let inner = tail[1..c].trim_end_matches('/').trim();
            inner.eq_ignore_ascii_case("br")
        });
        match close {
            Some(c) if is_break => {
                folded.push(' ');
                rest = &tail[c + 1..];
            }
            _ => {
                folded.push('<');
                rest = &tail[1..];
            }
        }
    }
    folded.push_str(rest);

    collapse_whitespace(&parse_tags(&folded).text)
}

/// Detect headings with the default vocabulary and spacing
pub fn detect_headings(page_text: &str, page_number: usize) -> Result<Vec<Heading>> {
    Ok(HeadingDetector::with_defaults()?.detect_headings(page_text, page_number))
}
