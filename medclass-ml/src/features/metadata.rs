//! Dense per-document metadata features.

use crate::data::DocumentText;
use regex::Regex;
use std::sync::LazyLock;

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]").expect("valid regex"));
static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Column names of a metadata row, in order.
pub const METADATA_FEATURES: [&str; 7] = [
    "title_length",
    "abstract_length",
    "title_word_count",
    "abstract_word_count",
    "abstract_sentence_terminators",
    "abstract_digit_runs",
    "title_uppercase_letters",
];

pub const METADATA_WIDTH: usize = METADATA_FEATURES.len();

/// Measure one document. Absent fields count as empty text.
pub fn metadata_row<D: DocumentText + ?Sized>(doc: &D) -> Vec<f64> {
    let title = doc.title().unwrap_or_default();
    let abstract_text = doc.abstract_text().unwrap_or_default();

    [
        title.chars().count(),
        abstract_text.chars().count(),
        title.split_whitespace().count(),
        abstract_text.split_whitespace().count(),
        SENTENCE_END.find_iter(abstract_text).count(),
        DIGIT_RUN.find_iter(abstract_text).count(),
        title.chars().filter(char::is_ascii_uppercase).count(),
    ]
    .into_iter()
    .map(|n| n as f64)
    .collect()
}
