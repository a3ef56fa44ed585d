// WHY: Markup handling shared by the page pipeline: tag stripping with exact
// span bookkeeping, entity decoding, and word extraction in markup coordinates

pub mod entities;
pub mod tag_parser;
pub mod words;

pub use entities::decode_entities;
pub use tag_parser::{
    mask_tags, parse_tags, ParsedMarkup, TagKind, TagParser, TagParserConfig, TagSpan,
};
pub use words::{extract_words, extract_words_plain, extract_words_with, WordSpan};
