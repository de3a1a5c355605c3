//! Noise filtering: strings that carry nothing to translate.
//!
//! A string is noise when it is too short, when it has no letters from any
//! script (numbers, prices, separators), or when it matches an ignore rule.

use std::path::Path;
use tracing::{debug, warn};

/// Case-folded ignore words.
///
/// Matching is bidirectional: a text is ignored when it contains a rule, or
/// when a rule contains the text. The second direction catches short UI
/// fragments ("ID", "OK") that appear inside a longer ignored phrase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreRules {
    words: Vec<String>,
}

impl IgnoreRules {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|word| word.as_ref().trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect();
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Empty text never matches; otherwise every text would be "contained" in
    /// every rule.
    pub fn matches(&self, text: &str) -> bool {
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return false;
        }
        self.words
            .iter()
            .any(|word| text.contains(word.as_str()) || word.contains(text.as_str()))
    }
}

/// Read an ignore-words file, one word per line. A missing or unreadable file
/// yields no words.
pub fn load_ignore_words(path: impl AsRef<Path>) -> Vec<String> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let words: Vec<String> = content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect();
            debug!("Loaded {} ignore words from {}", words.len(), path.display());
            words
        }
        Err(e) => {
            warn!("Ignored words file {} not readable: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// True when the text has no letter from any script.
pub fn has_no_letters(text: &str) -> bool {
    !text.chars().any(char::is_alphabetic)
}

#[derive(Debug, Clone)]
pub struct NoiseFilter {
    min_text_length: usize,
    rules: IgnoreRules,
}

impl NoiseFilter {
    pub fn new(min_text_length: usize, rules: IgnoreRules) -> Self {
        Self {
            min_text_length,
            rules,
        }
    }

    pub fn rules(&self) -> &IgnoreRules {
        &self.rules
    }

    /// Too short, or no letters at all.
    pub fn is_noise(&self, text: &str) -> bool {
        text.chars().count() < self.min_text_length || has_no_letters(text)
    }

    pub fn matches_ignore_rule(&self, text: &str) -> bool {
        self.rules.matches(text)
    }

    /// Noise or ignore-rule match.
    pub fn should_ignore(&self, text: &str) -> bool {
        self.is_noise(text) || self.matches_ignore_rule(text)
    }
}
