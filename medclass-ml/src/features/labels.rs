//! Multi-label binary indicator encoding.

use crate::data::split_labels;
use crate::error::FeatureExtractionError;
use serde::{Deserialize, Serialize};

/// Column order of the label vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelOrder {
    /// Alphabetical; identical across runs for the same label set.
    #[default]
    Sorted,
    /// Order of first appearance in the fitting corpus.
    FirstSeen,
}

/// A label seen at transform time that has no column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownLabel {
    pub row: usize,
    pub label: String,
}

/// Indicator rows plus every label that could not be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoding {
    pub matrix: Vec<Vec<u8>>,
    pub unknown: Vec<UnknownLabel>,
}

impl LabelEncoding {
    pub fn has_unknown(&self) -> bool {
        !self.unknown.is_empty()
    }
}

/// Binary encoder over a frozen label vocabulary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiLabelEncoder {
    order: LabelOrder,
    classes: Vec<String>,
}

impl MultiLabelEncoder {
    pub fn new(order: LabelOrder) -> Self {
        Self {
            order,
            classes: Vec::new(),
        }
    }

    pub fn order(&self) -> LabelOrder {
        self.order
    }

    /// Label vocabulary in column order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn is_fitted(&self) -> bool {
        !self.classes.is_empty()
    }

    /// Fit on raw pipe-delimited label strings and return their indicator rows.
    pub fn fit_transform<S: AsRef<str>>(
        &mut self,
        groups: &[S],
    ) -> Result<Vec<Vec<u8>>, FeatureExtractionError> {
        if groups.is_empty() {
            return Err(FeatureExtractionError::EmptyInput { what: "labels" });
        }
        let mut classes: Vec<String> = Vec::new();
        for group in groups {
            for label in split_labels(group.as_ref()) {
                if !classes.contains(&label) {
                    classes.push(label);
                }
            }
        }
        if classes.is_empty() {
            return Err(FeatureExtractionError::EmptyInput { what: "labels" });
        }
        if self.order == LabelOrder::Sorted {
            classes.sort();
        }
        self.classes = classes;
        Ok(self.transform(groups)?.matrix)
    }

    /// Encode against the fitted vocabulary, reporting unknown labels.
    pub fn transform<S: AsRef<str>>(
        &self,
        groups: &[S],
    ) -> Result<LabelEncoding, FeatureExtractionError> {
        if !self.is_fitted() {
            return Err(FeatureExtractionError::NotFitted {
                what: "label encoder",
            });
        }
        let mut unknown = Vec::new();
        let matrix = groups
            .iter()
            .enumerate()
            .map(|(row, group)| {
                let mut indicators = vec![0u8; self.classes.len()];
                for label in split_labels(group.as_ref()) {
                    match self.classes.iter().position(|c| *c == label) {
                        Some(col) => indicators[col] = 1,
                        None => unknown.push(UnknownLabel { row, label }),
                    }
                }
                indicators
            })
            .collect();
        Ok(LabelEncoding { matrix, unknown })
    }

    /// Label names of the set columns of one indicator row.
    pub fn decode(&self, row: &[u8]) -> Result<Vec<String>, FeatureExtractionError> {
        if row.len() != self.classes.len() {
            return Err(FeatureExtractionError::WidthMismatch {
                row: 0,
                expected: self.classes.len(),
                actual: row.len(),
            });
        }
        Ok(self
            .classes
            .iter()
            .zip(row)
            .filter(|(_, bit)| **bit != 0)
            .map(|(label, _)| label.clone())
            .collect())
    }
}
