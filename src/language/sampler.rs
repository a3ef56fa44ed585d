// WHY: Fragment sampling is separate from classification so tests can drive
// the vote with fixed fragments and a seeded RNG

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of text fragments to classify
pub trait TextSampler: Send {
    fn sample(&mut self) -> String;
}

/// Draws a run of consecutive words from a random position
pub struct RandomWordSampler<'a> {
    words: Vec<&'a str>,
    sample_words: usize,
    rng: StdRng,
}

impl<'a> RandomWordSampler<'a> {
    /// `seed` makes draws reproducible; `None` seeds from the OS
    pub fn new(text: &'a str, sample_words: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            words: text.split_whitespace().collect(),
            sample_words: sample_words.max(1),
            rng,
        }
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

impl<'a> TextSampler for RandomWordSampler<'a> {
    fn sample(&mut self) -> String {
        if self.words.len() <= self.sample_words {
            return self.words.join(" ");
        }
        let start = self.rng.gen_range(0..=self.words.len() - self.sample_words);
        self.words[start..start + self.sample_words].join(" ")
    }
}

/// Fragments handed out in order, cycling; for tests and fixed inputs
pub struct FixedSampler {
    fragments: Vec<String>,
    next: usize,
}

impl FixedSampler {
    pub fn new(fragments: Vec<String>) -> Self {
        Self { fragments, next: 0 }
    }
}

impl TextSampler for FixedSampler {
    fn sample(&mut self) -> String {
        if self.fragments.is_empty() {
            return String::new();
        }
        let fragment = self.fragments[self.next % self.fragments.len()].clone();
        self.next += 1;
        fragment
    }
}
