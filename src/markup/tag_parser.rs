// WHY: Pull-tokenizer that removes only allow-listed tags, so text that merely
// looks like markup survives and every removed token keeps its exact char span

use memchr::{memchr, memmem, memrchr};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;
use std::sync::OnceLock;
use tracing::debug;

use super::entities::decode_entities;
use crate::position::{BytePos, OffsetTracker};

/// Structural and inline HTML elements consumed as markup by default
pub const DEFAULT_KNOWN_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "address", "article", "aside", "b", "big", "blockquote", "body",
    "br", "caption", "center", "cite", "code", "col", "colgroup", "dd", "del", "dfn", "div",
    "dl", "dt", "em", "figcaption", "figure", "font", "footer", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "i", "img", "ins", "kbd", "li", "link", "main",
    "mark", "meta", "nav", "ol", "p", "pre", "q", "s", "samp", "script", "section", "small",
    "span", "strike", "strong", "style", "sub", "sup", "table", "tbody", "td", "tfoot", "th",
    "thead", "title", "tr", "tt", "u", "ul", "var", "wbr",
];

/// Longest tag (in bytes) scanned for its closing '>'; longer candidates stay text
const MAX_TAG_BYTES: usize = 4096;

/// Elements whose body is raw text that never reaches the plain text output
pub const DEFAULT_RAW_TEXT_TAGS: &[&str] = &["script", "style"];

/// Kind of a removed markup token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    StartTag,
    EndTag,
    SelfClosingTag,
    Comment,
    Doctype,
    ProcessingInstruction,
    CData,
    /// Body of a script/style element
    RawText,
}

/// Char span of one removed token in the original markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSpan {
    pub start: usize,
    pub end: usize,
    pub kind: TagKind,
}

impl TagSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Result of stripping markup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMarkup {
    /// Plain text with known tags removed and entities decoded
    pub text: String,
    /// Every removed token, in document order
    pub tags: Vec<TagSpan>,
}

/// Tag parser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TagParserConfig {
    /// Lower-case tag names treated as markup
    pub known_tags: HashSet<String>,
    /// Lower-case tag names whose body is discarded
    pub raw_text_tags: HashSet<String>,
}

impl Default for TagParserConfig {
    fn default() -> Self {
        Self {
            known_tags: DEFAULT_KNOWN_TAGS.iter().map(|t| t.to_string()).collect(),
            raw_text_tags: DEFAULT_RAW_TEXT_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Lexical token with byte range into the markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(Range<usize>),
    Markup { kind: TagKind, range: Range<usize> },
}

/// Markup token found while scanning, before it's emitted
#[derive(Debug, Clone)]
struct ScannedMarkup {
    kind: TagKind,
    range: Range<usize>,
    name: Option<String>,
}

pub struct TagParser {
    config: TagParserConfig,
}

impl TagParser {
    pub fn new(config: TagParserConfig) -> Self {
        Self { config }
    }

    pub fn with_default_tags() -> Self {
        Self::new(TagParserConfig::default())
    }

    /// Shared parser with the default allow-list
    pub fn shared() -> &'static TagParser {
        static PARSER: OnceLock<TagParser> = OnceLock::new();
        PARSER.get_or_init(TagParser::with_default_tags)
    }

    pub fn config(&self) -> &TagParserConfig {
        &self.config
    }

    fn is_known(&self, name: &str) -> bool {
        self.config.known_tags.contains(name) || self.config.raw_text_tags.contains(name)
    }

    /// Tokenize markup into text segments and markup tokens
    pub fn tokens<'a>(&'a self, markup: &'a str) -> Tokens<'a> {
        Tokens {
            parser: self,
            bytes: markup.as_bytes(),
            pos: 0,
            pending: None,
            raw_until: None,
            limits: ScanLimits {
                last_gt: memrchr(b'>', markup.as_bytes()),
                ..Default::default()
            },
        }
    }

    /// Strip markup, returning plain text plus the char spans of every removed token
    pub fn parse(&self, markup: &str) -> ParsedMarkup {
        let mut tracker = OffsetTracker::new(markup);
        let mut text = String::with_capacity(markup.len());
        let mut tags = Vec::new();

        for token in self.tokens(markup) {
            match token {
                Token::Text(range) => {
                    text.push_str(&decode_entities(&markup[range]));
                }
                Token::Markup { kind, range } => {
                    let start = tracker.advance_to_byte(BytePos(range.start)).0;
                    let end = tracker.advance_to_byte(BytePos(range.end)).0;
                    tags.push(TagSpan { start, end, kind });
                }
            }
        }

        debug!("Parsed markup: {} tag spans, {} bytes of text", tags.len(), text.len());
        ParsedMarkup { text, tags }
    }

    /// Try to read a markup token starting at the '<' at byte `lt`
    fn scan_markup(&self, bytes: &[u8], lt: usize, limits: &mut ScanLimits) -> Option<ScannedMarkup> {
        // Every token needs a '>' after its '<'
        if limits.last_gt.map_or(true, |gt| gt < lt) {
            return None;
        }
        let rest = &bytes[lt + 1..];

        if rest.starts_with(b"!--") {
            if limits.comment_unclosed {
                return None;
            }
            let Some(found) = memmem::find(&bytes[lt + 4..], b"-->") else {
                limits.comment_unclosed = true;
                return None;
            };
            let end = found + lt + 4 + 3;
            return Some(ScannedMarkup { kind: TagKind::Comment, range: lt..end, name: None });
        }
        if rest.starts_with(b"![CDATA[") {
            if limits.cdata_unclosed {
                return None;
            }
            let Some(found) = memmem::find(&bytes[lt + 9..], b"]]>") else {
                limits.cdata_unclosed = true;
                return None;
            };
            let end = found + lt + 9 + 3;
            return Some(ScannedMarkup { kind: TagKind::CData, range: lt..end, name: None });
        }
        if rest.len() >= 8 && rest[..8].eq_ignore_ascii_case(b"!doctype") {
            let end = memchr(b'>', rest)? + lt + 2;
            return Some(ScannedMarkup { kind: TagKind::Doctype, range: lt..end, name: None });
        }
        if rest.starts_with(b"?") {
            let end = memchr(b'>', rest)? + lt + 2;
            return Some(ScannedMarkup {
                kind: TagKind::ProcessingInstruction,
                range: lt..end,
                name: None,
            });
        }

        let (is_end_tag, name_start) = if rest.starts_with(b"/") { (true, lt + 2) } else { (false, lt + 1) };
        let name_end = read_name(bytes, name_start)?;

        // Name must be followed by whitespace, '/', or '>' to be a tag at all
        match bytes.get(name_end) {
            Some(b) if b.is_ascii_whitespace() || *b == b'/' || *b == b'>' => {}
            _ => return None,
        }

        let name = std::str::from_utf8(&bytes[name_start..name_end]).ok()?.to_ascii_lowercase();
        if !self.is_known(&name) {
            return None;
        }

        let close = find_tag_end_quoted(bytes, name_end)?;
        let kind = if is_end_tag {
            TagKind::EndTag
        } else if close > name_end && bytes[close - 1] == b'/' {
            TagKind::SelfClosingTag
        } else {
            TagKind::StartTag
        };

        Some(ScannedMarkup { kind, range: lt..close + 1, name: Some(name) })
    }
}

/// Iterator over markup tokens
pub struct Tokens<'a> {
    parser: &'a TagParser,
    bytes: &'a [u8],
    pos: usize,
    pending: Option<ScannedMarkup>,
    /// Set after a raw-text start tag: everything up to `</name>` is opaque
    raw_until: Option<String>,
    limits: ScanLimits,
}

/// What earlier scans proved about the rest of the input, so unterminated
/// constructs are not rescanned to the end again and again
#[derive(Debug, Default)]
struct ScanLimits {
    /// Byte offset of the last '>' in the input
    last_gt: Option<usize>,
    /// No "-->" follows some earlier "<!--", hence none follows any later one
    comment_unclosed: bool,
    cdata_unclosed: bool,
}

impl<'a> Tokens<'a> {
    fn emit_markup(&mut self, scanned: ScannedMarkup) -> Token {
        self.pos = scanned.range.end;
        if scanned.kind == TagKind::StartTag {
            if let Some(name) = scanned.name {
                if self.parser.config.raw_text_tags.contains(&name) {
                    self.raw_until = Some(name);
                }
            }
        }
        Token::Markup { kind: scanned.kind, range: scanned.range }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if let Some(scanned) = self.pending.take() {
            return Some(self.emit_markup(scanned));
        }

        if self.pos >= self.bytes.len() {
            return None;
        }

        if let Some(name) = self.raw_until.take() {
            let body_end = find_close_tag(self.bytes, self.pos, &name).unwrap_or(self.bytes.len());
            if body_end > self.pos {
                let range = self.pos..body_end;
                self.pos = body_end;
                return Some(Token::Markup { kind: TagKind::RawText, range });
            }
        }

        let mut search = self.pos;
        loop {
            let Some(offset) = memchr(b'<', &self.bytes[search..]) else {
                let range = self.pos..self.bytes.len();
                self.pos = self.bytes.len();
                return Some(Token::Text(range));
            };
            let lt = search + offset;

            match self.parser.scan_markup(self.bytes, lt, &mut self.limits) {
                Some(scanned) if lt > self.pos => {
                    let range = self.pos..lt;
                    self.pos = lt;
                    self.pending = Some(scanned);
                    return Some(Token::Text(range));
                }
                Some(scanned) => return Some(self.emit_markup(scanned)),
                // Not markup: the '<' stays literal text
                None => search = lt + 1,
            }
        }
    }
}

/// Read a tag name starting at `start`; returns the end byte
fn read_name(bytes: &[u8], start: usize) -> Option<usize> {
    let first = *bytes.get(start)?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    let mut end = start + 1;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'-' || bytes[end] == b':') {
        end += 1;
    }
    Some(end)
}

/// Position of the '>' closing a tag, skipping quoted attribute values.
/// Gives up after `MAX_TAG_BYTES`.
fn find_tag_end_quoted(bytes: &[u8], from: usize) -> Option<usize> {
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let limit = bytes.len().min(from.saturating_add(MAX_TAG_BYTES));

    for (offset, &byte) in bytes[from..limit].iter().enumerate() {
        match byte {
            b'"' if !in_single_quote => in_double_quote = !in_double_quote,
            b'\'' if !in_double_quote => in_single_quote = !in_single_quote,
            b'>' if !in_single_quote && !in_double_quote => return Some(from + offset),
            _ => {}
        }
    }
    None
}

/// Find a complete `</name ...>` (case-insensitive) at or after `from`
fn find_close_tag(bytes: &[u8], from: usize, name: &str) -> Option<usize> {
    let name = name.as_bytes();
    let mut search = from;
    while let Some(offset) = memmem::find(&bytes[search..], b"</") {
        let candidate = search + offset;
        let name_start = candidate + 2;
        let name_end = name_start + name.len();
        if name_end <= bytes.len() && bytes[name_start..name_end].eq_ignore_ascii_case(name) {
            let boundary = bytes.get(name_end);
            let is_name_end = boundary.is_some_and(|b| b.is_ascii_whitespace() || *b == b'>' || *b == b'/');
            if is_name_end && find_tag_end_quoted(bytes, name_end).is_some() {
                return Some(candidate);
            }
        }
        search = candidate + 2;
    }
    None
}

/// Parse markup with the default allow-list
pub fn parse_tags(markup: &str) -> ParsedMarkup {
    TagParser::shared().parse(markup)
}

/// Replace every tag span with spaces of the same char length.
///
/// The result has exactly as many chars as `markup`, so offsets computed on
/// it address the original markup directly.
pub fn mask_tags(markup: &str, tags: &[TagSpan]) -> String {
    let mut masked = String::with_capacity(markup.len());
    let mut spans = tags.iter().peekable();

    for (idx, ch) in markup.chars().enumerate() {
        while spans.peek().is_some_and(|span| span.end <= idx) {
            spans.next();
        }
        match spans.peek() {
            Some(span) if span.start <= idx => masked.push(' '),
            _ => masked.push(ch),
        }
    }

    masked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::slice_chars;

    fn span_texts<'a>(markup: &'a str, parsed: &ParsedMarkup) -> Vec<&'a str> {
        parsed.tags.iter().map(|t| slice_chars(markup, t.start, t.end)).collect()
    }

    /// Remove every tag span from the markup
    fn strip_spans(markup: &str, tags: &[TagSpan]) -> String {
        markup
            .chars()
            .enumerate()
            .filter(|(idx, _)| !tags.iter().any(|t| t.start <= *idx && *idx < t.end))
            .map(|(_, ch)| ch)
            .collect()
    }

    #[test]
    fn test_simple_paragraph() {
        let markup = "<p>This is a <strong>test</strong>.</p>";
        let parsed = parse_tags(markup);
        assert_eq!(parsed.text, "This is a test.");
        assert_eq!(span_texts(markup, &parsed), vec!["<p>", "<strong>", "</strong>", "</p>"]);
        assert_eq!(parsed.tags[0].kind, TagKind::StartTag);
        assert_eq!(parsed.tags[2].kind, TagKind::EndTag);
    }

    #[test]
    fn test_unknown_tags_stay_literal() {
        let markup = "He wrote <word> and <p>kept</p> going";
        let parsed = parse_tags(markup);
        assert_eq!(parsed.text, "He wrote <word> and kept going");
        assert_eq!(span_texts(markup, &parsed), vec!["<p>", "</p>"]);
    }

    #[test]
    fn test_script_and_style_bodies_discarded() {
        let markup = "a<script type=\"x\">if (1 < 2) { go(); }</script>b<STYLE>p{}</STYLE>c";
        let parsed = parse_tags(markup);
        assert_eq!(parsed.text, "abc");
        assert_eq!(
            span_texts(markup, &parsed),
            vec!["<script type=\"x\">", "if (1 < 2) { go(); }", "</script>", "<STYLE>", "p{}", "</STYLE>"]
        );
        assert_eq!(parsed.tags[1].kind, TagKind::RawText);
    }

    #[test]
    fn test_unterminated_script_swallows_rest() {
        let markup = "x<script>never closed";
        let parsed = parse_tags(markup);
        assert_eq!(parsed.text, "x");
        assert_eq!(span_texts(markup, &parsed), vec!["<script>", "never closed"]);
    }

    #[test]
    fn test_script_close_tag_needs_closing_bracket() {
        let markup = "<script>a</script";
        let parsed = parse_tags(markup);
        assert_eq!(parsed.text, "");
        assert_eq!(span_texts(markup, &parsed), vec!["<script>", "a</script"]);
        assert!(crate::markup::extract_words(markup).is_empty());

        let markup = "<script>a</script >b";
        let parsed = parse_tags(markup);
        assert_eq!(parsed.text, "b");
        assert_eq!(span_texts(markup, &parsed), vec!["<script>", "a", "</script >"]);
    }

    #[test]
    fn test_many_unterminated_constructs_stay_text() {
        let markup = "<!-- x <![CDATA[ y <p title=\"z ".repeat(2000);
        let parsed = parse_tags(&markup);
        assert_eq!(parsed.text, markup);
        assert!(parsed.tags.is_empty());

        // A later closer still completes tokens that precede it
        let markup = format!("{}<!-- ok -->", "<!-- open ".repeat(50));
        let parsed = parse_tags(&markup);
        assert_eq!(parsed.tags.len(), 1);
        assert_eq!(parsed.tags[0].kind, TagKind::Comment);
    }

    #[test]
    fn test_oversized_tag_stays_text() {
        let markup = format!("<p title=\"{}\">body", "x".repeat(MAX_TAG_BYTES));
        let parsed = parse_tags(&markup);
        assert_eq!(parsed.text, markup);
    }

    #[test]
    fn test_declarations_and_comments() {
        let markup = "<!DOCTYPE html><?xml version=\"1.0\"?><!-- note <p> -->A<![CDATA[<b>x</b>]]>B<br/>";
        let parsed = parse_tags(markup);
        assert_eq!(parsed.text, "AB");
        let kinds: Vec<TagKind> = parsed.tags.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TagKind::Doctype,
                TagKind::ProcessingInstruction,
                TagKind::Comment,
                TagKind::CData,
                TagKind::SelfClosingTag
            ]
        );
        assert_eq!(span_texts(markup, &parsed)[3], "<![CDATA[<b>x</b>]]>");
    }

    #[test]
    fn test_malformed_markup_degrades_to_text() {
        let markup = "1 < 2 and <p unclosed and <!-- open comment";
        let parsed = parse_tags(markup);
        assert_eq!(parsed.text, markup);
        assert!(parsed.tags.is_empty());
    }

    #[test]
    fn test_quoted_attribute_with_angle_bracket() {
        let markup = "<a title=\"x > y\" href='z'>link</a>";
        let parsed = parse_tags(markup);
        assert_eq!(parsed.text, "link");
        assert_eq!(span_texts(markup, &parsed)[0], "<a title=\"x > y\" href='z'>");
    }

    #[test]
    fn test_entities_decoded_inline() {
        let parsed = parse_tags("<i>caf&eacute;</i> &amp; cr&#232;me");
        assert_eq!(parsed.text, "café & crème");
        assert_eq!(parsed.tags.len(), 2);
    }

    #[test]
    fn test_char_offsets_with_multibyte_text() {
        let markup = "ñ<b>é</b>";
        let parsed = parse_tags(markup);
        assert_eq!(parsed.tags[0], TagSpan { start: 1, end: 4, kind: TagKind::StartTag });
        assert_eq!(parsed.tags[1], TagSpan { start: 5, end: 9, kind: TagKind::EndTag });
    }

    #[test]
    fn test_tag_round_trip() {
        let samples = [
            "<html><head><title>T</title></head><body><p>One &amp; two.</p></body></html>",
            "plain <unknown> text <em>with</em> <!--c--> bits",
            "<div class='a'>x<script>var a = '<p>';</script>y</div>",
        ];
        for markup in samples {
            let parsed = parse_tags(markup);
            let stripped = strip_spans(markup, &parsed.tags);
            assert_eq!(decode_entities(&stripped), parsed.text, "round trip failed for {markup}");
        }
    }

    #[test]
    fn test_spans_are_disjoint_and_ordered() {
        let markup = "<p>a</p><p>b<br>c</p><!--x--><span>d</span>";
        let parsed = parse_tags(markup);
        for pair in parsed.tags.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn test_custom_allow_list() {
        let mut config = TagParserConfig::default();
        config.known_tags.insert("ruby".to_string());
        let parser = TagParser::new(config);
        assert_eq!(parser.parse("<ruby>漢</ruby>").text, "漢");
        assert_eq!(parse_tags("<ruby>漢</ruby>").text, "<ruby>漢</ruby>");
    }

    #[test]
    fn test_mask_tags_preserves_length() {
        let markup = "<p>Hé said.</p>";
        let parsed = parse_tags(markup);
        let masked = mask_tags(markup, &parsed.tags);
        assert_eq!(masked.chars().count(), markup.chars().count());
        assert_eq!(masked, "   Hé said.    ");
    }
}
