//! Corpus document types.

use serde::{Deserialize, Serialize};

/// Separator between labels in the raw `group` field.
pub const LABEL_SEPARATOR: char = '|';

/// Split a raw `group` value into trimmed, non-empty labels, preserving order.
pub fn split_labels(group: &str) -> Vec<String> {
    group
        .split(LABEL_SEPARATOR)
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

/// A validated corpus row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Row index in the source table.
    pub id: usize,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub labels: Vec<String>,
}

impl Document {
    pub fn new(
        id: usize,
        title: impl Into<String>,
        abstract_text: impl Into<String>,
        labels: Vec<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            abstract_text: abstract_text.into(),
            labels,
        }
    }

    /// Build a document from a raw pipe-delimited `group` value.
    pub fn from_group(
        id: usize,
        title: impl Into<String>,
        abstract_text: impl Into<String>,
        group: &str,
    ) -> Self {
        Self::new(id, title, abstract_text, split_labels(group))
    }

    /// Labels joined back into the raw `group` form.
    pub fn group(&self) -> String {
        self.labels.join(&LABEL_SEPARATOR.to_string())
    }

    pub fn is_multi_label(&self) -> bool {
        self.labels.len() > 1
    }
}

/// Read access to the two text fields, tolerant of missing values.
///
/// Metadata extraction works over anything implementing this so that rows with
/// absent text can be measured without first being validated.
pub trait DocumentText {
    fn title(&self) -> Option<&str>;
    fn abstract_text(&self) -> Option<&str>;
}

impl DocumentText for Document {
    fn title(&self) -> Option<&str> {
        Some(&self.title)
    }

    fn abstract_text(&self) -> Option<&str> {
        Some(&self.abstract_text)
    }
}

/// An unvalidated row; any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub group: Option<String>,
}

impl DocumentText for RawRecord {
    fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn abstract_text(&self) -> Option<&str> {
        self.abstract_text.as_deref()
    }
}

/// Normalized text of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    pub id: usize,
    pub normalized_title: String,
    pub normalized_abstract: String,
}

impl NormalizedDocument {
    /// Title and abstract joined with a single space.
    pub fn combined(&self) -> String {
        format!("{} {}", self.normalized_title, self.normalized_abstract)
            .trim()
            .to_string()
    }
}
