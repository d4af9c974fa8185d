//! Paired text and metadata feature rows.

use crate::error::FeatureExtractionError;
use serde::{Deserialize, Serialize};

/// Text and metadata features for the same documents, row-aligned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub text: Vec<Vec<f64>>,
    pub metadata: Vec<Vec<f64>>,
    pub text_width: usize,
    pub metadata_width: usize,
}

impl FeatureMatrix {
    /// Pair the two blocks, checking that row counts agree and every row has
    /// its block's width.
    pub fn new(
        text: Vec<Vec<f64>>,
        text_width: usize,
        metadata: Vec<Vec<f64>>,
        metadata_width: usize,
    ) -> Result<Self, FeatureExtractionError> {
        if text.len() != metadata.len() {
            return Err(FeatureExtractionError::RowCountMismatch {
                text: text.len(),
                metadata: metadata.len(),
            });
        }
        check_widths(&text, text_width)?;
        check_widths(&metadata, metadata_width)?;
        Ok(Self {
            text,
            metadata,
            text_width,
            metadata_width,
        })
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Text row followed by metadata row.
    pub fn combined_row(&self, row: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.text_width + self.metadata_width);
        out.extend_from_slice(&self.text[row]);
        out.extend_from_slice(&self.metadata[row]);
        out
    }

    /// Rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            text: indices.iter().map(|&i| self.text[i].clone()).collect(),
            metadata: indices.iter().map(|&i| self.metadata[i].clone()).collect(),
            text_width: self.text_width,
            metadata_width: self.metadata_width,
        }
    }
}

fn check_widths(rows: &[Vec<f64>], width: usize) -> Result<(), FeatureExtractionError> {
    match rows.iter().position(|r| r.len() != width) {
        Some(row) => Err(FeatureExtractionError::WidthMismatch {
            row,
            expected: width,
            actual: rows[row].len(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_shape() {
        let ok = FeatureMatrix::new(vec![vec![1.0, 0.0]], 2, vec![vec![3.0]], 1).unwrap();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok.combined_row(0), vec![1.0, 0.0, 3.0]);

        assert_eq!(
            FeatureMatrix::new(vec![vec![1.0]], 1, vec![], 1).unwrap_err(),
            FeatureExtractionError::RowCountMismatch { text: 1, metadata: 0 }
        );
        assert_eq!(
            FeatureMatrix::new(vec![vec![1.0], vec![]], 1, vec![vec![0.0], vec![0.0]], 1)
                .unwrap_err(),
            FeatureExtractionError::WidthMismatch {
                row: 1,
                expected: 1,
                actual: 0
            }
        );
    }

    #[test]
    fn test_select_keeps_widths() {
        let m = FeatureMatrix::new(
            vec![vec![1.0], vec![2.0], vec![3.0]],
            1,
            vec![vec![10.0], vec![20.0], vec![30.0]],
            1,
        )
        .unwrap();
        let sub = m.select(&[2, 0]);
        assert_eq!(sub.text, vec![vec![3.0], vec![1.0]]);
        assert_eq!(sub.metadata, vec![vec![30.0], vec![10.0]]);
        assert_eq!(sub.text_width, 1);
    }
}
