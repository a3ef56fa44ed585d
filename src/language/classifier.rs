//! Fragment classifiers.
//!
//! [`FragmentClassifier`] is the seam for language identification backends.
//! The built-in [`HeuristicClassifier`] works offline in two stages:
//!
//! 1. **Script analysis**: dominant Unicode blocks identify non-Latin scripts
//!    (Cyrillic, Greek, Arabic, Hebrew, Devanagari, Thai, Hangul, Kana, Han).
//! 2. **Latin disambiguation**: stop-word frequencies plus diacritic markers
//!    pick among the common Western European languages.
//!
//! [`FnClassifier`] wraps a closure, for tests or external engines.

use anyhow::Result;
use futures::future::{self, BoxFuture, FutureExt};

/// Asynchronous language identification of one text fragment
pub trait FragmentClassifier: Send + Sync {
    /// Language code (ISO 639-1 where possible) of the fragment
    fn classify<'a>(&'a self, fragment: &'a str) -> BoxFuture<'a, Result<String>>;
}

/// Heuristic result for one fragment
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub language: &'static str,
    /// Confidence score (0.0–1.0)
    pub confidence: f32,
}

/// Stop words per Latin-script language
const STOP_WORDS: &[(&str, &[&str])] = &[
    ("en", &["the", "and", "of", "to", "is", "was", "that", "with", "for", "his", "her", "it", "had", "not", "but", "which", "you", "be", "they", "this"]),
    ("fr", &["le", "la", "les", "des", "est", "dans", "avec", "une", "sur", "pour", "pas", "qui", "que", "et", "il", "elle", "au", "du", "ce", "nous"]),
    ("es", &["el", "los", "las", "del", "por", "para", "pero", "como", "más", "que", "y", "una", "con", "se", "su", "al", "lo", "muy", "está", "había", "de", "la", "en", "un", "no", "es"]),
    ("de", &["der", "die", "das", "und", "ist", "nicht", "ein", "eine", "mit", "sich", "auf", "den", "dem", "zu", "von", "ich", "er", "sie", "war", "auch"]),
    ("it", &["il", "di", "che", "non", "per", "una", "della", "gli", "sono", "con", "del", "le", "lo", "si", "ma", "come", "anche", "più", "era", "questo"]),
    ("pt", &["o", "os", "as", "de", "do", "da", "dos", "não", "uma", "com", "para", "que", "em", "se", "ao", "mas", "como", "ele", "ela", "foi", "seu"]),
    ("nl", &["de", "het", "een", "en", "van", "is", "niet", "dat", "op", "te", "zijn", "met", "voor", "ik", "hij", "zij", "maar", "ook", "wat", "naar"]),
    ("sv", &["och", "att", "det", "som", "en", "på", "är", "av", "för", "med", "till", "den", "inte", "har", "jag", "hon", "var", "om", "sig", "från"]),
    ("da", &["og", "at", "det", "som", "en", "på", "er", "af", "for", "med", "til", "den", "ikke", "har", "jeg", "hun", "var", "om", "sig", "fra"]),
    ("no", &["og", "at", "det", "som", "en", "på", "er", "av", "for", "med", "til", "den", "ikke", "har", "jeg", "hun", "var", "om", "seg", "fra"]),
];

/// Diacritics that point to one language
const DIACRITIC_MARKERS: &[(&str, &[char])] = &[
    ("fr", &['è', 'ê', 'ç', 'œ', 'ù', 'î', 'ô', 'ë']),
    ("es", &['ñ', '¿', '¡']),
    ("de", &['ß', 'ä', 'ü']),
    ("pt", &['ã', 'õ']),
    ("sv", &['ä', 'å']),
    ("da", &['æ', 'ø', 'å']),
    ("no", &['æ', 'ø', 'å']),
];

/// Offline script and stop-word classifier
#[derive(Debug, Clone, Default)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify synchronously
    pub fn detect(&self, text: &str) -> Detection {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Detection { language: "en", confidence: 0.0 };
        }

        let mut counts = ScriptCounts::default();
        for c in trimmed.chars().filter(|c| c.is_alphabetic()) {
            counts.add(c);
        }
        if counts.total == 0 {
            return Detection { language: "en", confidence: 0.1 };
        }

        if let Some(detection) = counts.dominant_script(trimmed) {
            return detection;
        }
        if counts.ratio(counts.latin) > 0.5 {
            return detect_latin_language(trimmed);
        }

        Detection { language: "en", confidence: 0.3 }
    }
}

impl FragmentClassifier for HeuristicClassifier {
    fn classify<'a>(&'a self, fragment: &'a str) -> BoxFuture<'a, Result<String>> {
        future::ready(Ok(self.detect(fragment).language.to_string())).boxed()
    }
}

#[derive(Default)]
struct ScriptCounts {
    total: u32,
    latin: u32,
    cyrillic: u32,
    greek: u32,
    arabic: u32,
    hebrew: u32,
    devanagari: u32,
    thai: u32,
    hangul: u32,
    kana: u32,
    han: u32,
}

impl ScriptCounts {
    fn add(&mut self, c: char) {
        self.total += 1;
        match c {
            '\u{0041}'..='\u{024F}' | '\u{1E00}'..='\u{1EFF}' => self.latin += 1,
            '\u{0370}'..='\u{03FF}' | '\u{1F00}'..='\u{1FFF}' => self.greek += 1,
            '\u{0400}'..='\u{052F}' | '\u{2DE0}'..='\u{2DFF}' | '\u{A640}'..='\u{A69F}' => self.cyrillic += 1,
            '\u{0590}'..='\u{05FF}' => self.hebrew += 1,
            '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}' | '\u{08A0}'..='\u{08FF}' | '\u{FB50}'..='\u{FDFF}' | '\u{FE70}'..='\u{FEFF}' => {
                self.arabic += 1
            }
            '\u{0900}'..='\u{097F}' => self.devanagari += 1,
            '\u{0E00}'..='\u{0E7F}' => self.thai += 1,
            '\u{AC00}'..='\u{D7AF}' | '\u{1100}'..='\u{11FF}' => self.hangul += 1,
            '\u{3040}'..='\u{30FF}' => self.kana += 1,
            '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' => self.han += 1,
            _ => {}
        }
    }

    fn ratio(&self, count: u32) -> f32 {
        count as f32 / self.total as f32
    }

    fn detection(&self, language: &'static str, count: u32) -> Detection {
        Detection { language, confidence: (0.70 + self.ratio(count) * 0.25).min(0.95) }
    }

    /// Non-Latin script holding most letters, if any
    fn dominant_script(&self, text: &str) -> Option<Detection> {
        // Japanese mixes Kana with Han, so any Kana settles it
        if self.kana > 0 && self.ratio(self.kana + self.han) > 0.5 {
            return Some(self.detection("ja", self.kana + self.han));
        }
        if self.ratio(self.cyrillic) > 0.5 {
            let language = if text.contains(['і', 'ї', 'є', 'ґ']) {
                "uk"
            } else if text.contains('ў') {
                "be"
            } else {
                "ru"
            };
            return Some(self.detection(language, self.cyrillic));
        }

        let scripts = [
            ("el", self.greek),
            ("ar", self.arabic),
            ("he", self.hebrew),
            ("hi", self.devanagari),
            ("th", self.thai),
            ("ko", self.hangul),
            ("zh", self.han),
        ];
        scripts
            .into_iter()
            .find(|(_, count)| self.ratio(*count) > 0.5)
            .map(|(language, count)| self.detection(language, count))
    }
}

/// Disambiguate among Latin-script languages by stop words and diacritics
fn detect_latin_language(text: &str) -> Detection {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect();

    let mut scores: Vec<(&'static str, f32)> = STOP_WORDS.iter().map(|(lang, _)| (*lang, 0.0)).collect();
    for (i, (_, stop_words)) in STOP_WORDS.iter().enumerate() {
        scores[i].1 += words.iter().filter(|w| stop_words.contains(*w)).count() as f32;
    }
    for (lang, markers) in DIACRITIC_MARKERS {
        if lower.contains(*markers) {
            if let Some(score) = scores.iter_mut().find(|(l, _)| l == lang) {
                score.1 += 2.0;
            }
        }
    }

    // Normalize by word count so longer texts don't inflate any one language
    let word_count = words.len().max(1) as f32;
    let mut best = ("en", 0.0f32);
    let mut runner_up = 0.0f32;
    for (lang, score) in scores {
        let norm = score / word_count;
        if norm > best.1 {
            runner_up = best.1;
            best = (lang, norm);
        } else if norm > runner_up {
            runner_up = norm;
        }
    }

    if best.1 < 0.01 {
        // No markers found: default English with low confidence
        return Detection { language: "en", confidence: 0.4 };
    }

    Detection {
        language: best.0,
        confidence: (0.60 + (best.1 - runner_up).min(0.20)).min(0.85),
    }
}

/// Classifier backed by a synchronous closure
pub struct FnClassifier<F> {
    classify: F,
}

impl<F> FnClassifier<F>
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    pub fn new(classify: F) -> Self {
        Self { classify }
    }
}

impl<F> FragmentClassifier for FnClassifier<F>
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn classify<'a>(&'a self, fragment: &'a str) -> BoxFuture<'a, Result<String>> {
        future::ready((self.classify)(fragment)).boxed()
    }
}
