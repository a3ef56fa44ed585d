// WHY: Document language by majority vote over random fragments; confusable
// languages vote as one group so near-ties between them do not stall the vote

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, warn};

pub mod classifier;
pub mod sampler;

pub use classifier::{Detection, FnClassifier, FragmentClassifier, HeuristicClassifier};
pub use sampler::{FixedSampler, RandomWordSampler, TextSampler};

pub use crate::config::LanguageDetectorConfig;

/// Groups of language codes that classifiers confuse with each other
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimilarityGroups {
    groups: Vec<Vec<String>>,
}

impl Default for SimilarityGroups {
    fn default() -> Self {
        Self::new([
            vec!["no", "nb", "nn", "da", "sv"],
            vec!["hr", "sr", "bs"],
            vec!["cs", "sk"],
            vec!["ms", "id"],
            vec!["ru", "uk", "be"],
        ])
    }
}

/// Vote bucket: a configured group or a language outside every group
#[derive(Debug, Clone, PartialEq, Eq)]
enum GroupKey {
    Group(usize),
    Single(String),
}

impl SimilarityGroups {
    pub fn new<'a>(groups: impl IntoIterator<Item = Vec<&'a str>>) -> Self {
        Self {
            groups: groups
                .into_iter()
                .map(|g| g.into_iter().map(normalize_code).collect())
                .collect(),
        }
    }

    /// No grouping: every language votes alone
    pub fn none() -> Self {
        Self { groups: Vec::new() }
    }

    pub fn groups(&self) -> &[Vec<String>] {
        &self.groups
    }

    /// Whether two codes share a group (or are equal)
    pub fn are_similar(&self, a: &str, b: &str) -> bool {
        self.key(&normalize_code(a)) == self.key(&normalize_code(b))
    }

    fn key(&self, code: &str) -> GroupKey {
        self.groups
            .iter()
            .position(|g| g.iter().any(|c| c == code))
            .map(GroupKey::Group)
            .unwrap_or_else(|| GroupKey::Single(code.to_string()))
    }
}

/// Vote counts per group in first-seen order
fn tally(votes: &[String], groups: &SimilarityGroups) -> Vec<(GroupKey, usize)> {
    let mut counts: Vec<(GroupKey, usize)> = Vec::new();
    for vote in votes {
        let key = groups.key(vote);
        match counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => *count += 1,
            None => counts.push((key, 1)),
        }
    }
    counts
}

/// Most frequent member of a group, first-seen on ties
fn resolve(votes: &[String], groups: &SimilarityGroups, key: &GroupKey) -> Option<String> {
    let mut members: Vec<(&str, usize)> = Vec::new();
    for vote in votes.iter().filter(|v| groups.key(v) == *key) {
        match members.iter_mut().find(|(m, _)| *m == vote.as_str()) {
            Some((_, count)) => *count += 1,
            None => members.push((vote.as_str(), 1)),
        }
    }
    let best = members.iter().map(|(_, c)| *c).max()?;
    members
        .into_iter()
        .find(|(_, c)| *c == best)
        .map(|(m, _)| m.to_string())
}

/// Language whose group holds a strict majority of the votes
pub fn majority_language(votes: &[String], groups: &SimilarityGroups) -> Option<String> {
    let total = votes.len();
    let (key, _) = tally(votes, groups)
        .into_iter()
        .find(|(_, count)| *count > total - *count)?;
    resolve(votes, groups, &key)
}

/// Language of the most voted group, first-seen on ties
pub fn plurality_language(votes: &[String], groups: &SimilarityGroups) -> Option<String> {
    let counts = tally(votes, groups);
    let best = counts.iter().map(|(_, c)| *c).max()?;
    let (key, _) = counts.into_iter().find(|(_, c)| *c == best)?;
    resolve(votes, groups, &key)
}

/// Sample fragments and classify them until one similarity group has a
/// majority or the attempt budget runs out.
///
/// Failed or timed-out classifications use up attempts without voting. The
/// last error is returned only when no classification succeeded.
pub async fn detect_language<S, C>(
    sampler: &mut S,
    classifier: &C,
    config: &LanguageDetectorConfig,
) -> Result<String>
where
    S: TextSampler + ?Sized,
    C: FragmentClassifier + ?Sized,
{
    let budget = config.initial_samples.max(1) + config.max_extra_samples;
    let mut votes: Vec<String> = Vec::new();
    let mut last_error = None;

    for attempt in 1..=budget {
        let fragment = sampler.sample();
        match timeout(config.classify_timeout(), classifier.classify(&fragment)).await {
            Ok(Ok(code)) => {
                debug!("Language vote {}: {}", attempt, code);
                votes.push(normalize_code(&code));
            }
            Ok(Err(e)) => {
                warn!("Language classification failed on attempt {}: {}", attempt, e);
                last_error = Some(e);
            }
            Err(_) => {
                warn!("Language classification timed out on attempt {}", attempt);
                last_error = Some(anyhow!(
                    "language classification timed out after {:?}",
                    config.classify_timeout()
                ));
            }
        }

        if attempt >= config.initial_samples {
            if let Some(language) = majority_language(&votes, &config.similarity_groups) {
                info!("Detected language {} after {} samples", language, attempt);
                return Ok(language);
            }
        }
    }

    match plurality_language(&votes, &config.similarity_groups) {
        Some(language) => {
            info!("No majority after {} samples, using most voted language {}", budget, language);
            Ok(language)
        }
        None => Err(last_error.unwrap_or_else(|| anyhow!("no language samples could be classified"))),
    }
}

/// Lower-case, trimmed language code
pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn votes(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    /// Classifier answering from a script, counting calls
    fn scripted(answers: &[&str]) -> (FnClassifier<impl Fn(&str) -> Result<String> + Send + Sync>, Arc<AtomicUsize>) {
        let answers = votes(answers);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let classifier = FnClassifier::new(move |_: &str| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            match answers.get(n) {
                Some(code) if code == "!" => Err(anyhow!("backend unavailable")),
                Some(code) => Ok(code.clone()),
                None => Err(anyhow!("script exhausted")),
            }
        });
        (classifier, calls)
    }

    fn sampler() -> RandomWordSampler<'static> {
        RandomWordSampler::new("some words to sample from in tests", 3, Some(7))
    }

    #[test]
    fn test_majority_needs_more_than_all_others() {
        let groups = SimilarityGroups::none();
        assert_eq!(majority_language(&votes(&["en", "en", "fr"]), &groups), Some("en".into()));
        assert_eq!(majority_language(&votes(&["en", "fr"]), &groups), None);
        assert_eq!(majority_language(&votes(&["en", "fr", "de"]), &groups), None);
        assert_eq!(majority_language(&[], &groups), None);
    }

    #[test]
    fn test_group_majority_resolves_to_most_frequent_member() {
        let groups = SimilarityGroups::default();
        assert_eq!(majority_language(&votes(&["no", "da", "da", "en"]), &groups), Some("da".into()));
        // tie inside the group: first seen wins
        assert_eq!(majority_language(&votes(&["nb", "sv", "en"]), &groups), Some("nb".into()));
        assert!(groups.are_similar("RU", "uk"));
        assert!(!groups.are_similar("ru", "en"));
    }

    #[test]
    fn test_plurality_first_seen_on_ties() {
        let groups = SimilarityGroups::none();
        assert_eq!(plurality_language(&votes(&["fr", "en", "en", "fr", "de"]), &groups), Some("fr".into()));
        assert_eq!(plurality_language(&[], &groups), None);
    }

    #[tokio::test]
    async fn test_three_draws_settle_clear_majority() {
        let (classifier, calls) = scripted(&["en", "en", "fr"]);
        let language = detect_language(&mut sampler(), &classifier, &LanguageDetectorConfig::default())
            .await
            .expect("language");
        assert_eq!(language, "en");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_extra_draws_until_majority() {
        let (classifier, calls) = scripted(&["en", "fr", "de", "fr", "fr", "fr"]);
        let config = LanguageDetectorConfig {
            similarity_groups: SimilarityGroups::none(),
            ..Default::default()
        };
        let language = detect_language(&mut sampler(), &classifier, &config).await.expect("language");
        assert_eq!(language, "fr");
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_budget_exhausted_returns_plurality() {
        let script = ["en", "fr", "de", "it"].repeat(4);
        let (classifier, calls) = scripted(&script);
        let config = LanguageDetectorConfig {
            similarity_groups: SimilarityGroups::none(),
            ..Default::default()
        };
        let language = detect_language(&mut sampler(), &classifier, &config).await.expect("language");
        assert_eq!(language, "en");
        assert_eq!(calls.load(Ordering::SeqCst), 13);
    }

    #[tokio::test]
    async fn test_failures_consume_attempts() {
        let (classifier, calls) = scripted(&["!", "de", "!", "de"]);
        let language = detect_language(&mut sampler(), &classifier, &LanguageDetectorConfig::default())
            .await
            .expect("language");
        assert_eq!(language, "de");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_all_failures_propagate_error() {
        let classifier = FnClassifier::new(|_: &str| -> Result<String> { Err(anyhow!("backend unavailable")) });
        let err = detect_language(&mut sampler(), &classifier, &LanguageDetectorConfig::default())
            .await
            .expect_err("no votes");
        assert!(err.to_string().contains("backend unavailable"));
    }

    struct SlowClassifier;

    impl FragmentClassifier for SlowClassifier {
        fn classify<'a>(&'a self, _fragment: &'a str) -> futures::future::BoxFuture<'a, Result<String>> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok("en".to_string())
            })
        }
    }

    #[tokio::test]
    async fn test_timeouts_bound_each_classification() {
        let config = LanguageDetectorConfig {
            classify_timeout_ms: 50,
            initial_samples: 2,
            max_extra_samples: 1,
            ..Default::default()
        };
        let err = detect_language(&mut sampler(), &SlowClassifier, &config)
            .await
            .expect_err("every attempt times out");
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_heuristic_classifier_end_to_end() {
        let text = "The old man and the sea is a story that was written by a man who had lived it. ".repeat(20);
        let mut sampler = RandomWordSampler::new(&text, 50, Some(1));
        let language = detect_language(&mut sampler, &HeuristicClassifier::new(), &LanguageDetectorConfig::default())
            .await
            .expect("language");
        assert_eq!(language, "en");
    }
}
