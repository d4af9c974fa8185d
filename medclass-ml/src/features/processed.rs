//! A fully preprocessed corpus, ready to hand to an external trainer.

use crate::data::{Document, NormalizedDocument};
use crate::error::MlError;
use crate::features::extractor::FeatureExtractor;
use crate::features::matrix::FeatureMatrix;
use crate::persistence::atomic_write_json;
use crate::text::NormalizerChain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Normalized text, feature matrices and label indicators for a whole corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedCorpus {
    pub created_at: DateTime<Utc>,
    pub documents: Vec<NormalizedDocument>,
    pub feature_names: Vec<String>,
    pub metadata_features: Vec<String>,
    pub features: FeatureMatrix,
    pub label_names: Vec<String>,
    pub labels: Vec<Vec<u8>>,
}

impl ProcessedCorpus {
    /// Normalize `documents`, fit `extractor` on all of them and encode labels.
    pub fn build(
        documents: &[Document],
        normalizer: &NormalizerChain,
        extractor: &mut FeatureExtractor,
    ) -> Result<Self, MlError> {
        let normalized = normalizer.normalize_documents(documents);
        let features = extractor.fit_matrix(&normalized, documents)?;
        let groups: Vec<String> = documents.iter().map(Document::group).collect();
        let labels = extractor.encode_labels(&groups)?;

        Ok(Self {
            created_at: Utc::now(),
            documents: normalized,
            feature_names: extractor.feature_names(),
            metadata_features: extractor
                .metadata_feature_names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            features,
            label_names: extractor.label_names().to_vec(),
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn export(&self, path: &Path) -> Result<(), MlError> {
        atomic_write_json(path, self)?;
        tracing::info!(
            path = %path.display(),
            rows = self.len(),
            width = self.features.text_width,
            "Exported processed corpus"
        );
        Ok(())
    }
}
