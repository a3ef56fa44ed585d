// WHY: Every tunable of the pipeline in one place, with defaults, validation,
// and TOML loading so the CLI and library callers share the same knobs

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::language::SimilarityGroups;
use crate::markup::TagParserConfig;
use crate::paging::headings::{HeadingPatterns, DEFAULT_CHAPTER_HEADER_DISTANCE};
use crate::sentence_detector::TokenizerChoice;

/// Default page length target in chars
pub const DEFAULT_TARGET_LENGTH: usize = 3000;

/// Default allowed deviation from the target, as a fraction
pub const DEFAULT_TOLERANCE: f64 = 0.25;

/// Markers after which a transcription's boilerplate begins
pub const DEFAULT_END_SENTINELS: &[&str] = &[
    "*** END OF THE PROJECT GUTENBERG EBOOK",
    "*** END OF THIS PROJECT GUTENBERG EBOOK",
    "***END OF THE PROJECT GUTENBERG EBOOK",
    "End of the Project Gutenberg EBook",
    "End of Project Gutenberg's",
    "End of this Project Gutenberg Etext",
];

/// Page splitting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    /// Target page length in chars
    pub target_length: usize,
    /// Fraction of the target a boundary may deviate by
    pub tolerance: f64,
    /// Minimum char distance between two kept headings on a page
    pub chapter_header_distance: usize,
    /// Case-insensitive end-of-transcription markers
    pub end_sentinels: Vec<String>,
    /// Heading template vocabulary
    pub headings: HeadingPatterns,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            target_length: DEFAULT_TARGET_LENGTH,
            tolerance: DEFAULT_TOLERANCE,
            chapter_header_distance: DEFAULT_CHAPTER_HEADER_DISTANCE,
            end_sentinels: DEFAULT_END_SENTINELS.iter().map(|s| s.to_string()).collect(),
            headings: HeadingPatterns::default(),
        }
    }
}

impl PagingConfig {
    /// Config with the given target and tolerance, everything else default
    pub fn with_target(target_length: usize, tolerance: f64) -> Self {
        Self {
            target_length,
            tolerance,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_length == 0 {
            bail!("target_length must be greater than zero");
        }
        if !(0.0..1.0).contains(&self.tolerance) {
            bail!("tolerance must be in [0, 1), got {}", self.tolerance);
        }
        Ok(())
    }
}

/// Language detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageDetectorConfig {
    /// Samples drawn before the first majority check
    pub initial_samples: usize,
    /// Additional single draws allowed when no majority emerges
    pub max_extra_samples: usize,
    /// Words per sampled fragment
    pub sample_words: usize,
    /// Upper bound on one classification, in milliseconds
    pub classify_timeout_ms: u64,
    /// Seed for the fragment sampler; random when absent
    pub seed: Option<u64>,
    /// Groups of mutually confusable language codes
    pub similarity_groups: SimilarityGroups,
}

impl Default for LanguageDetectorConfig {
    fn default() -> Self {
        Self {
            initial_samples: 3,
            max_extra_samples: 10,
            sample_words: 100,
            classify_timeout_ms: 10_000,
            seed: None,
            similarity_groups: SimilarityGroups::default(),
        }
    }
}

impl LanguageDetectorConfig {
    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_ms)
    }
}

/// Sentence extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentenceConfig {
    pub tokenizer: TokenizerChoice,
    /// Language used when detection is disabled or yields nothing
    pub fallback_language: String,
}

impl Default for SentenceConfig {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerChoice::Statistical,
            fallback_language: "en".to_string(),
        }
    }
}

/// Whole-pipeline configuration, loadable from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paging: PagingConfig,
    pub markup: TagParserConfig,
    pub sentences: SentenceConfig,
    pub language: LanguageDetectorConfig,
    /// Skip detection and use this language code
    pub language_override: Option<String>,
    /// Max pages processed concurrently; 0 means one per CPU
    pub concurrency: usize,
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse pipeline config")?;
        config.paging.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Effective page concurrency
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency == 0 {
            num_cpus::get().max(1)
        } else {
            self.concurrency
        }
    }
}
