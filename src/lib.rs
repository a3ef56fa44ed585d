pub mod config;
pub mod language;
pub mod markup;
pub mod normalization;
pub mod pipeline;
pub mod position;
pub mod paging;
pub mod reader;
pub mod sentence_detector;

// Re-export main types for convenient access
pub use config::{LanguageDetectorConfig, PagingConfig, PipelineConfig, SentenceConfig};
pub use markup::{extract_words, parse_tags, ParsedMarkup, TagParser, WordSpan};
pub use paging::{split_into_pages, Document, Heading, HeadingDetector, Page, PageSplitter};
pub use pipeline::{Pipeline, ProcessedDocument};

// Re-export sentence and language entry points
pub use sentence_detector::{
    break_into_sentences, break_markup_into_sentences, Sentence, SentenceMap, SentenceTokenizer, TokenizerChoice,
};
pub use language::{detect_language, FragmentClassifier, HeuristicClassifier, SimilarityGroups, TextSampler};
