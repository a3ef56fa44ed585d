// WHY: End-to-end document processing: language once per document, then
// pages split lazily and sentence maps built in parallel on blocking threads

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::language::{detect_language, FragmentClassifier, HeuristicClassifier, RandomWordSampler};
use crate::markup::TagParser;
use crate::paging::{Document, Heading, Page, PageSplitter};
use crate::sentence_detector::{break_markup_into_sentences_with, ResourceRegistry, TokenizerChoice};

/// Result of processing one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedDocument {
    /// Detected (or configured) language code
    pub language: String,
    pub pages: Vec<Page>,
    /// Every kept heading, in document order
    pub table_of_contents: Vec<Heading>,
}

impl ProcessedDocument {
    pub fn word_count(&self) -> usize {
        self.pages.iter().map(|p| p.words.len()).sum()
    }

    pub fn sentence_count(&self) -> usize {
        self.pages
            .iter()
            .filter_map(|p| p.sentences.as_ref())
            .map(|s| s.len())
            .sum()
    }
}

/// Shared, read-only processing components
pub struct Pipeline {
    config: PipelineConfig,
    splitter: Arc<PageSplitter>,
    parser: Arc<TagParser>,
    registry: Arc<ResourceRegistry>,
    classifier: Arc<dyn FragmentClassifier>,
}

impl Pipeline {
    /// Pipeline with the offline heuristic classifier
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_classifier(config, Arc::new(HeuristicClassifier::new()))
    }

    pub fn with_classifier(config: PipelineConfig, classifier: Arc<dyn FragmentClassifier>) -> Result<Self> {
        let splitter = PageSplitter::with_markup(config.paging.clone(), config.markup.clone())
            .context("Failed to build page splitter")?;
        Ok(Self {
            splitter: Arc::new(splitter),
            parser: Arc::new(TagParser::new(config.markup.clone())),
            registry: Arc::new(ResourceRegistry::with_defaults()),
            classifier,
            config,
        })
    }

    /// Replace the sentence tokenizer resources
    pub fn with_registry(mut self, registry: ResourceRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process a whole document
    pub async fn process(&self, text: &str) -> Result<ProcessedDocument> {
        self.process_with_progress(text, |_, _| {}).await
    }

    /// Process a whole document, reporting (pages done, pages total) after each page
    pub async fn process_with_progress<F>(&self, text: &str, on_page: F) -> Result<ProcessedDocument>
    where
        F: Fn(usize, usize),
    {
        let start_time = Instant::now();
        let document = self.splitter.document(text);
        let language = self.language(&document).await?;

        let pages: Vec<Page> = self.splitter.pages(&document).collect();
        let total = pages.len();
        debug!("Split document into {} pages", total);

        let choice = self.config.sentences.tokenizer;
        let concurrency = self.config.effective_concurrency();
        let mut done = 0usize;

        // WHY: buffered (not buffer_unordered) keeps pages in document order
        let pages: Vec<Page> = stream::iter(pages)
            .map(|page| {
                let parser = Arc::clone(&self.parser);
                let registry = Arc::clone(&self.registry);
                let language = language.clone();
                tokio::task::spawn_blocking(move || annotate_page(page, &parser, &registry, &language, choice))
            })
            .buffered(concurrency)
            .map(|joined| joined.context("Page worker panicked"))
            .inspect_ok(|_| {
                done += 1;
                on_page(done, total);
            })
            .try_collect()
            .await?;

        let table_of_contents: Vec<Heading> = pages.iter().flat_map(|p| p.headings.iter().cloned()).collect();
        let processed = ProcessedDocument { language, pages, table_of_contents };

        info!(
            "Processed {} chars: {} pages, {} words, {} sentences, {} headings in {}ms",
            document.end(),
            processed.pages.len(),
            processed.word_count(),
            processed.sentence_count(),
            processed.table_of_contents.len(),
            start_time.elapsed().as_millis()
        );
        Ok(processed)
    }

    /// Configured override, detected language, or the fallback for wordless text
    async fn language(&self, document: &Document) -> Result<String> {
        if let Some(language) = &self.config.language_override {
            debug!("Using configured language {}", language);
            return Ok(language.clone());
        }

        let detection = &self.config.language;
        let mut sampler = RandomWordSampler::new(document.content(), detection.sample_words, detection.seed);
        if sampler.word_count() == 0 {
            return Ok(self.config.sentences.fallback_language.clone());
        }

        detect_language(&mut sampler, self.classifier.as_ref(), detection)
            .await
            .context("Language detection failed")
    }
}

/// Attach the sentence map to one page
fn annotate_page(
    mut page: Page,
    parser: &TagParser,
    registry: &ResourceRegistry,
    language: &str,
    choice: TokenizerChoice,
) -> Page {
    let sentences = break_markup_into_sentences_with(parser, &page.content, &page.words, language, choice, registry);
    debug!("Page {}: {} words, {} sentences", page.number, page.words.len(), sentences.len());
    page.sentences = Some(sentences);
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PagingConfig;
    use crate::language::FnClassifier;

    fn config(target: usize) -> PipelineConfig {
        PipelineConfig {
            paging: PagingConfig::with_target(target, 0.25),
            concurrency: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_pages_carry_dense_sentence_maps() {
        let text = "It was a dark night. The rain fell hard. Nobody came.\n\n".repeat(30);
        let pipeline = Pipeline::new(config(300)).expect("pipeline");
        let processed = pipeline.process(&text).await.expect("processed");

        assert_eq!(processed.language, "en");
        assert!(processed.pages.len() > 3);
        for (i, page) in processed.pages.iter().enumerate() {
            assert_eq!(page.number, i + 1);
            let map = page.sentences.as_ref().expect("sentences attached");
            assert_eq!(map.word_to_sentence.len(), page.words.len());
            assert!(map.word_to_sentence.iter().all(|&s| s < map.sentences.len()));
        }
    }

    #[tokio::test]
    async fn test_table_of_contents_in_order() {
        let body = "The story goes on and on without end. ".repeat(60);
        let text = format!("CHAPTER I\n\n{body}\n\nCHAPTER II\n\n{body}\n\nCHAPTER III\n\n{body}");
        let pipeline = Pipeline::new(config(1000)).expect("pipeline");
        let processed = pipeline.process(&text).await.expect("processed");

        let titles: Vec<&str> = processed.table_of_contents.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["CHAPTER I", "CHAPTER II", "CHAPTER III"]);
        let pages: Vec<usize> = processed.table_of_contents.iter().map(|h| h.location.page).collect();
        assert!(pages.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_table_of_contents_spacing_across_pages() {
        let text = format!(
            "{}\n\nChapter 1\n\nChapter 2\n\nChapter 3\n\nChapter 4\n\n{}",
            "word ".repeat(598),
            "word ".repeat(600)
        );
        let config = PipelineConfig {
            language_override: Some("en".into()),
            ..Default::default()
        };
        let processed = Pipeline::new(config).expect("pipeline").process(&text).await.expect("processed");
        let titles: Vec<&str> = processed.table_of_contents.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["Chapter 1"]);
    }

    #[tokio::test]
    async fn test_language_override_skips_classifier() {
        let classifier = Arc::new(FnClassifier::new(|_: &str| -> Result<String> {
            Err(anyhow::anyhow!("should not be called"))
        }));
        let config = PipelineConfig {
            language_override: Some("fr".into()),
            ..config(500)
        };
        let pipeline = Pipeline::with_classifier(config, classifier).expect("pipeline");
        let processed = pipeline.process("Bonjour. Au revoir.").await.expect("processed");
        assert_eq!(processed.language, "fr");
    }

    #[tokio::test]
    async fn test_classifier_failure_propagates() {
        let classifier = Arc::new(FnClassifier::new(|_: &str| -> Result<String> { Err(anyhow::anyhow!("offline")) }));
        let pipeline = Pipeline::with_classifier(config(500), classifier).expect("pipeline");
        assert!(pipeline.process("Some text here.").await.is_err());
    }

    #[tokio::test]
    async fn test_empty_document() {
        let pipeline = Pipeline::new(config(500)).expect("pipeline");
        let processed = pipeline.process("").await.expect("processed");
        assert!(processed.pages.is_empty());
        assert!(processed.table_of_contents.is_empty());
        assert_eq!(processed.language, "en");
    }

    #[tokio::test]
    async fn test_progress_reports_every_page() {
        let text = "One more sentence here. ".repeat(200);
        let pipeline = Pipeline::new(config(400)).expect("pipeline");
        let seen = std::sync::Mutex::new(Vec::new());
        let processed = pipeline
            .process_with_progress(&text, |done, total| {
                if let Ok(mut seen) = seen.lock() {
                    seen.push((done, total));
                }
            })
            .await
            .expect("processed");
        let seen = seen.into_inner().expect("progress lock");
        assert_eq!(seen.len(), processed.pages.len());
        assert_eq!(seen.last(), Some(&(processed.pages.len(), processed.pages.len())));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Pipeline::new(config(0)).is_err());
    }
}
