//! Individual normalization stages.
//!
//! Every stage is a pure `&str -> String` function. Stages never fail; text
//! they cannot make sense of comes out as an empty string.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s]").expect("valid regex"));
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Medical abbreviations expanded by default.
pub const DEFAULT_ABBREVIATIONS: &[(&str, &str)] = &[
    ("cv", "cardiovascular"),
    ("neuro", "neurological"),
    ("hepato", "hepatorenal"),
    ("onco", "oncological"),
    ("mi", "myocardial infarction"),
    ("cad", "coronary artery disease"),
    ("chf", "congestive heart failure"),
    ("cva", "cerebrovascular accident"),
    ("tia", "transient ischemic attack"),
    ("copd", "chronic obstructive pulmonary disease"),
    ("dm", "diabetes mellitus"),
    ("htn", "hypertension"),
];

/// English function words removed by default.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "will",
    "would", "could", "should", "may", "might", "must", "can", "this", "that", "these", "those",
];

/// A single step of the normalizer chain.
pub trait TextStage: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Transform `text`. Must be pure and must not panic.
    fn apply(&self, text: &str) -> String;
}

/// Lowercases, replaces punctuation with spaces and collapses whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cleaner;

impl TextStage for Cleaner {
    fn name(&self) -> &str {
        "clean"
    }

    fn apply(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let stripped = NON_WORD.replace_all(&lowered, " ");
        WHITESPACE_RUN
            .replace_all(&stripped, " ")
            .trim()
            .to_string()
    }
}

/// Token-wise dictionary substitution of domain abbreviations.
#[derive(Debug, Clone)]
pub struct AbbreviationExpander {
    table: HashMap<String, String>,
}

impl AbbreviationExpander {
    pub fn new() -> Self {
        Self::with_entries(DEFAULT_ABBREVIATIONS.iter().copied())
    }

    /// Build an expander from explicit entries only, without the defaults.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let table = entries
            .into_iter()
            .map(|(abbr, full)| (abbr.to_lowercase(), full.to_string()))
            .collect();
        Self { table }
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, abbreviation: &str, expansion: &str) {
        self.table
            .insert(abbreviation.to_lowercase(), expansion.to_string());
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for AbbreviationExpander {
    fn default() -> Self {
        Self::new()
    }
}

impl TextStage for AbbreviationExpander {
    fn name(&self) -> &str {
        "expand_abbreviations"
    }

    fn apply(&self, text: &str) -> String {
        text.split_whitespace()
            .map(|token| {
                self.table
                    .get(token)
                    .map(String::as_str)
                    .unwrap_or(token)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Drops tokens found in a stop-word set (case-insensitive).
#[derive(Debug, Clone)]
pub struct StopWordFilter {
    words: HashSet<String>,
}

impl StopWordFilter {
    /// Default set plus `extra` words.
    pub fn new<S: AsRef<str>>(extra: &[S]) -> Self {
        let words = DEFAULT_STOP_WORDS
            .iter()
            .map(|w| w.to_string())
            .chain(extra.iter().map(|w| w.as_ref().to_lowercase()))
            .collect();
        Self { words }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }

    pub fn words(&self) -> &HashSet<String> {
        &self.words
    }
}

impl Default for StopWordFilter {
    fn default() -> Self {
        Self::new::<&str>(&[])
    }
}

impl TextStage for StopWordFilter {
    fn name(&self) -> &str {
        "remove_stop_words"
    }

    fn apply(&self, text: &str) -> String {
        text.split_whitespace()
            .filter(|token| !self.contains(token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleaner_strips_punctuation_and_case() {
        let out = Cleaner.apply("  Acute MI: a (rare) case-study!! ");
        assert_eq!(out, "acute mi a rare case study");
    }

    #[test]
    fn test_cleaner_replaces_underscore() {
        assert_eq!(Cleaner.apply("beta_blocker"), "beta blocker");
    }

    #[test]
    fn test_cleaner_keeps_digits_and_unicode_letters() {
        assert_eq!(Cleaner.apply("Type-2 Diabète"), "type 2 diabète");
    }

    #[test]
    fn test_expander_multi_word() {
        let out = AbbreviationExpander::new().apply("acute mi and htn");
        assert_eq!(out, "acute myocardial infarction and hypertension");
    }

    #[test]
    fn test_expander_unmatched_tokens_pass_through() {
        let out = AbbreviationExpander::new().apply("microbiome study");
        assert_eq!(out, "microbiome study");
    }

    #[test]
    fn test_expander_custom_entry() {
        let mut expander = AbbreviationExpander::with_entries(std::iter::empty::<(&str, &str)>());
        assert!(expander.is_empty());
        expander.insert("CKD", "chronic kidney disease");
        assert_eq!(expander.apply("ckd"), "chronic kidney disease");
    }

    #[test]
    fn test_stop_words_case_insensitive() {
        let filter = StopWordFilter::new(&["Patients"]);
        assert_eq!(
            filter.apply("The patients WITH heart failure"),
            "heart failure"
        );
    }
}
