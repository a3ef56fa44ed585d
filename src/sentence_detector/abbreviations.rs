// WHY: Per-language abbreviation resources for the statistical tokenizer,
// loaded once and shared read-only across pages and threads

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use tracing::debug;

/// Seed abbreviations per language, lower-case with the final period removed.
/// Internal periods stay ("e.g", "u.s.a").
const SEED_ABBREVIATIONS: &[(&str, &[&str])] = &[
    (
        "en",
        &[
            "dr", "mr", "mrs", "ms", "prof", "sr", "jr", "st", "mt", "capt", "col", "gen", "lt",
            "rev", "hon", "messrs", "vs", "etc", "e.g", "i.e", "a.m", "p.m", "u.s", "u.s.a", "u.k",
            "no", "vol", "ch", "ft", "lbs", "oz", "mi", "km", "deg", "ea", "al", "viz", "cf",
        ],
    ),
    ("fr", &["m", "mm", "mme", "mlle", "mgr", "dr", "st", "ste", "etc", "cf", "p", "av", "apr", "j.-c"]),
    ("de", &["hr", "fr", "dr", "prof", "st", "z.b", "u.a", "usw", "bzw", "vgl", "nr", "ca", "d.h", "s"]),
    ("es", &["sr", "sra", "srta", "dr", "dra", "d", "dña", "ud", "uds", "etc", "pág", "núm", "p.ej"]),
    ("it", &["sig", "sigg", "sig.ra", "dott", "prof", "ing", "avv", "ecc", "pag", "n", "s"]),
    ("pt", &["sr", "sra", "srta", "dr", "dra", "d", "exmo", "etc", "pág", "n", "v.g"]),
    ("nl", &["dhr", "mevr", "mw", "dr", "prof", "blz", "bijv", "enz", "d.w.z", "nr", "st"]),
];

/// Language resources the statistical tokenizer consults
#[derive(Debug, Clone)]
pub struct LanguageResources {
    pub language: String,
    abbreviations: HashSet<String>,
}

impl LanguageResources {
    pub fn new<'a>(language: &str, abbreviations: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            language: language_key(language),
            abbreviations: abbreviations.into_iter().map(abbreviation_key).collect(),
        }
    }

    /// Check a word (any case, trailing period optional) against the seed list
    pub fn is_abbreviation(&self, word: &str) -> bool {
        self.abbreviations.contains(&abbreviation_key(word))
    }

    pub fn len(&self) -> usize {
        self.abbreviations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abbreviations.is_empty()
    }
}

/// Registry of per-language resources keyed by primary language subtag
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: HashMap<String, LanguageResources>,
}

impl ResourceRegistry {
    /// Empty registry; every lookup falls back to the rule-based tokenizer
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in seed lists
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (language, abbreviations) in SEED_ABBREVIATIONS {
            registry.insert(LanguageResources::new(language, abbreviations.iter().copied()));
        }
        debug!("Loaded sentence resources for {} languages", registry.resources.len());
        registry
    }

    /// Process-wide registry with the built-in lists, built on first use
    pub fn shared() -> &'static ResourceRegistry {
        static SHARED: OnceLock<ResourceRegistry> = OnceLock::new();
        SHARED.get_or_init(Self::with_defaults)
    }

    pub fn insert(&mut self, resources: LanguageResources) {
        self.resources.insert(resources.language.clone(), resources);
    }

    /// Resources for a language code such as "en" or "en-GB"
    pub fn get(&self, language: &str) -> Option<&LanguageResources> {
        self.resources.get(&language_key(language))
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.resources.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }
}

fn language_key(language: &str) -> String {
    language
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

fn abbreviation_key(word: &str) -> String {
    word.trim().trim_end_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    // WHY: Single shared registry instance reduces test overhead
    fn registry() -> &'static ResourceRegistry {
        ResourceRegistry::shared()
    }

    #[test]
    fn test_seed_lookup_is_case_and_period_insensitive() {
        let english = registry().get("en").expect("english resources");
        for word in ["Dr.", "dr", "MR.", "U.S.A.", "e.g.", "p.m."] {
            assert!(english.is_abbreviation(word), "{word} should be an abbreviation");
        }
        assert!(!english.is_abbreviation("Hello"));
        assert!(!english.is_abbreviation("U.S.A.B."));
    }

    #[test]
    fn test_region_subtags_resolve_to_language() {
        assert!(registry().get("en-GB").is_some());
        assert!(registry().get("FR_ca").is_some());
        assert!(registry().get("zz").is_none());
        assert!(ResourceRegistry::new().get("en").is_none());
    }

    #[test]
    fn test_custom_resources() {
        let mut registry = ResourceRegistry::new();
        registry.insert(LanguageResources::new("la", ["cf.", "Ibid."]));
        let latin = registry.get("la").expect("inserted");
        assert!(latin.is_abbreviation("ibid."));
        assert_eq!(latin.len(), 2);
        assert_eq!(registry.languages(), vec!["la"]);
    }
}
