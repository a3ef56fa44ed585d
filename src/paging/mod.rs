// WHY: Page splitting orchestrator: boundary search inside a tolerance window,
// per-page normalization, heading detection and word extraction

pub mod boundaries;
pub mod headings;

use anyhow::Result;
use memchr::memmem;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PagingConfig;
use crate::markup::{extract_words_with, TagParser, TagParserConfig, WordSpan};
use crate::normalization::normalize_page;
use crate::position::{BytePos, CharIndex, CharPos};
use crate::sentence_detector::SentenceMap;

pub use boundaries::{Boundary, BoundaryKind, BoundaryPatterns};
pub use headings::{Heading, HeadingDetector, HeadingLocation, HeadingPatterns};

/// How far before the window a boundary match may start and still cut inside it
const MATCH_BACKOFF_CHARS: usize = 32;

/// Full document text with its detected end
#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    index: CharIndex,
    /// Char offset where content ends (first end sentinel or text length)
    end: usize,
}

impl Document {
    /// Load text, truncating at the default end-of-transcription sentinels
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_sentinels(text, &PagingConfig::default().end_sentinels)
    }

    pub fn with_sentinels(text: impl Into<String>, sentinels: &[String]) -> Self {
        let text = text.into();
        let index = CharIndex::new(&text);
        let end = match find_end_sentinel(&text, sentinels) {
            Some(byte) => {
                let end = index.char_of(BytePos(byte)).0;
                info!("End-of-transcription marker found at char {}", end);
                end
            }
            None => index.char_len(),
        };
        Self { text, index, end }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Total length in chars
    pub fn len(&self) -> usize {
        self.index.char_len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Char offset where paging stops
    pub fn end(&self) -> usize {
        self.end
    }

    /// Content up to the document end
    pub fn content(&self) -> &str {
        &self.text[..self.index.byte_of(CharPos(self.end)).0]
    }

    /// Slice by char range
    pub fn slice(&self, start: usize, end: usize) -> &str {
        let start = self.index.byte_of(CharPos(start)).0;
        let end = self.index.byte_of(CharPos(end)).0;
        &self.text[start..end]
    }
}

/// Earliest byte offset of any sentinel, ASCII case-insensitive
fn find_end_sentinel(text: &str, sentinels: &[String]) -> Option<usize> {
    // WHY: ASCII lowercasing keeps byte offsets identical to the original
    let lower = text.to_ascii_lowercase();
    sentinels
        .iter()
        .filter(|s| !s.is_empty())
        .filter_map(|s| memmem::find(lower.as_bytes(), s.to_ascii_lowercase().as_bytes()))
        .min()
}

/// One display page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number
    pub number: usize,
    /// Char offset of the page start in the document
    pub start: usize,
    /// Char offset of the page end in the document (exclusive)
    pub end: usize,
    /// Normalized page text
    pub content: String,
    pub headings: Vec<Heading>,
    /// Word spans into `content`
    pub words: Vec<WordSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentences: Option<SentenceMap>,
}

/// Page splitter with compiled boundary and heading libraries
pub struct PageSplitter {
    config: PagingConfig,
    boundaries: BoundaryPatterns,
    headings: HeadingDetector,
    parser: TagParser,
}

impl PageSplitter {
    /// Validate tunables and compile pattern libraries
    pub fn new(config: PagingConfig) -> Result<Self> {
        Self::with_markup(config, TagParserConfig::default())
    }

    /// Splitter whose word and heading positions honor a custom tag allow-list
    pub fn with_markup(config: PagingConfig, markup: TagParserConfig) -> Result<Self> {
        config.validate()?;
        let boundaries = BoundaryPatterns::new()?;
        let headings = HeadingDetector::new(&config.headings, config.chapter_header_distance)?;
        info!(
            "Page splitter ready: target {} chars, tolerance {}",
            config.target_length, config.tolerance
        );
        Ok(Self {
            config,
            boundaries,
            headings,
            parser: TagParser::new(markup),
        })
    }

    pub fn config(&self) -> &PagingConfig {
        &self.config
    }

    pub fn heading_detector(&self) -> &HeadingDetector {
        &self.headings
    }

    pub fn tag_parser(&self) -> &TagParser {
        &self.parser
    }

    /// Load a document using this splitter's sentinel list
    pub fn document(&self, text: impl Into<String>) -> Document {
        Document::with_sentinels(text, &self.config.end_sentinels)
    }

    /// Lazy page sequence; calling again restarts from the first page
    pub fn pages<'a>(&'a self, document: &'a Document) -> Pages<'a> {
        let haystack = document.content();
        Pages {
            splitter: self,
            document,
            haystack,
            content_end: document.index.char_of(BytePos(haystack.trim_end().len())).0,
            start: 0,
            number: 0,
            last_heading: None,
        }
    }

    /// Choose where the page starting at `start` ends (char offsets)
    fn next_cut(&self, document: &Document, haystack: &str, start: usize) -> usize {
        let end = document.end();
        let target_length = self.config.target_length as f64;
        let target = start as f64 + target_length;
        let lo = (start as f64 + target_length * (1.0 - self.config.tolerance)).min(end as f64);
        let hi = (start as f64 + target_length * (1.0 + self.config.tolerance)).min(end as f64);
        let hard_cap = end.min(start + self.config.target_length);

        let search_start = (lo.floor() as usize).saturating_sub(MATCH_BACKOFF_CHARS).max(start);
        let search_end = (hi.ceil() as usize + MATCH_BACKOFF_CHARS).min(end);
        let search = document.index.byte_of(CharPos(search_start)).0..document.index.byte_of(CharPos(search_end)).0;

        let to_char = |byte: usize| document.index.char_of(BytePos(byte)).0;
        let best = self.boundaries.best_cut(
            haystack,
            search,
            |cut| {
                let c = to_char(cut);
                c > start && lo <= c as f64 && c as f64 <= hi
            },
            |cut| (to_char(cut) as f64 - target).abs(),
        );

        match best {
            Some(boundary) => {
                let cut = to_char(boundary.cut);
                debug!("Page boundary at {} ({:?})", cut, boundary.kind);
                cut
            }
            None => {
                debug!("No boundary in window, hard cap at {}", hard_cap);
                hard_cap
            }
        }
    }
}

/// Lazy, finite page iterator
pub struct Pages<'a> {
    splitter: &'a PageSplitter,
    document: &'a Document,
    haystack: &'a str,
    /// Char offset just past the last non-whitespace char of the content
    content_end: usize,
    start: usize,
    number: usize,
    /// Document char offset of the last kept heading
    last_heading: Option<usize>,
}

impl<'a> Iterator for Pages<'a> {
    type Item = Page;

    fn next(&mut self) -> Option<Page> {
        // Slices that normalize to nothing are absorbed into the next page
        let start = self.start;
        while self.start < self.document.end() {
            let mut cut = self.splitter.next_cut(self.document, self.haystack, self.start);
            if cut >= self.content_end {
                // Trailing whitespace belongs to the last page
                cut = self.document.end();
            }
            self.start = cut;

            let slice = self.document.slice(start, cut);
            let content = normalize_page(slice);
            if content.is_empty() {
                continue;
            }

            self.number += 1;
            let words = extract_words_with(&self.splitter.parser, &content);

            let since_previous = self.last_heading.map(|offset| start - offset);
            let raw_headings = self.splitter.headings.detect_headings_after(
                &self.splitter.parser,
                slice,
                self.number,
                since_previous,
            );
            if let Some(last) = raw_headings.last() {
                self.last_heading = Some(start + last.location.offset);
            }

            // Headings are found on the raw slice; the word index is invariant
            // under normalization, so it relocates the offset into `content`
            let headings = raw_headings
                .into_iter()
                .map(|mut heading| {
                    if let Some(word) = words.get(heading.location.word_index) {
                        heading.location.offset = word.start;
                    }
                    heading
                })
                .collect();

            return Some(Page {
                number: self.number,
                start,
                end: cut,
                content,
                headings,
                words,
                sentences: None,
            });
        }
        None
    }
}

/// Split a whole document into pages
pub fn split_into_pages(document_text: &str, config: &PagingConfig) -> Result<Vec<Page>> {
    let splitter = PageSplitter::new(config.clone())?;
    let document = splitter.document(document_text);
    let pages: Vec<Page> = splitter.pages(&document).collect();
    info!("Split {} chars into {} pages", document.end(), pages.len());
    Ok(pages)
}
