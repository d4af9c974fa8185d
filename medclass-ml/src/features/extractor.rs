//! The feature extractor: text vectors, metadata vectors and label encoding
//! sharing one instance's fitted state.

use crate::data::{DocumentText, NormalizedDocument};
use crate::error::FeatureExtractionError;
use crate::features::labels::{LabelEncoding, LabelOrder, MultiLabelEncoder};
use crate::features::matrix::FeatureMatrix;
use crate::features::metadata::{METADATA_FEATURES, METADATA_WIDTH, metadata_row};
use crate::features::vectorizer::{TfidfVectorizer, VectorizerParams};
use serde::{Deserialize, Serialize};

/// Whether text features came from a fresh fit or an existing vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Fitted,
    Projected,
}

/// Text feature rows with a description of how they were produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFeatures {
    pub rows: Vec<Vec<f64>>,
    pub width: usize,
    pub requested_max_features: usize,
    pub kind: FeatureKind,
    /// The vocabulary is narrower than requested.
    pub truncated: bool,
    /// Terms with no column; always zero for a fresh fit.
    pub out_of_vocabulary_tokens: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureExtractor {
    params: VectorizerParams,
    vectorizer: Option<TfidfVectorizer>,
    labels: MultiLabelEncoder,
}

impl FeatureExtractor {
    /// `params.max_features` is the default for [`Self::fit_matrix`];
    /// [`Self::extract_text_features`] takes its own bound.
    pub fn new(params: VectorizerParams, label_order: LabelOrder) -> Self {
        Self {
            params,
            vectorizer: None,
            labels: MultiLabelEncoder::new(label_order),
        }
    }

    /// Fit a new vocabulary on `texts` and return their vectors.
    ///
    /// Replaces any previously fitted vocabulary.
    pub fn extract_text_features(
        &mut self,
        texts: &[String],
        max_features: usize,
    ) -> Result<TextFeatures, FeatureExtractionError> {
        let mut vectorizer = TfidfVectorizer::new(VectorizerParams {
            max_features,
            ..self.params.clone()
        });
        vectorizer.fit(texts)?;
        let (rows, _) = vectorizer.transform(texts)?;
        let width = vectorizer.width();
        if width < max_features {
            tracing::debug!(width, requested = max_features, "Vocabulary narrower than requested");
        }
        self.vectorizer = Some(vectorizer);
        Ok(TextFeatures {
            rows,
            width,
            requested_max_features: max_features,
            kind: FeatureKind::Fitted,
            truncated: width < max_features,
            out_of_vocabulary_tokens: 0,
        })
    }

    /// Vectorize `texts` with the vocabulary from the last fit.
    pub fn project_text_features(&self, texts: &[String]) -> Result<TextFeatures, FeatureExtractionError> {
        let vectorizer = self
            .vectorizer
            .as_ref()
            .ok_or(FeatureExtractionError::NotFitted { what: "vectorizer" })?;
        let (rows, out_of_vocabulary_tokens) = vectorizer.transform(texts)?;
        let requested = vectorizer.params().max_features;
        Ok(TextFeatures {
            rows,
            width: vectorizer.width(),
            requested_max_features: requested,
            kind: FeatureKind::Projected,
            truncated: vectorizer.width() < requested,
            out_of_vocabulary_tokens,
        })
    }

    /// One 7-field row per document, in input order.
    pub fn extract_metadata_features<D: DocumentText>(
        &self,
        documents: &[D],
    ) -> Result<Vec<Vec<f64>>, FeatureExtractionError> {
        if documents.is_empty() {
            return Err(FeatureExtractionError::EmptyInput {
                what: "metadata features",
            });
        }
        Ok(documents.iter().map(metadata_row).collect())
    }

    /// Fit the label vocabulary on raw pipe-delimited strings.
    pub fn encode_labels<S: AsRef<str>>(
        &mut self,
        label_strings: &[S],
    ) -> Result<Vec<Vec<u8>>, FeatureExtractionError> {
        self.labels.fit_transform(label_strings)
    }

    /// Encode against the frozen label vocabulary.
    pub fn transform_labels<S: AsRef<str>>(
        &self,
        label_strings: &[S],
    ) -> Result<LabelEncoding, FeatureExtractionError> {
        self.labels.transform(label_strings)
    }

    pub fn decode_labels(&self, row: &[u8]) -> Result<Vec<String>, FeatureExtractionError> {
        self.labels.decode(row)
    }

    /// Fitted vocabulary in column order; empty before the first fit.
    pub fn feature_names(&self) -> Vec<String> {
        self.vectorizer
            .as_ref()
            .map(TfidfVectorizer::feature_names)
            .unwrap_or_default()
    }

    pub fn metadata_feature_names(&self) -> &'static [&'static str] {
        &METADATA_FEATURES
    }

    pub fn label_names(&self) -> &[String] {
        self.labels.classes()
    }

    pub fn vectorizer(&self) -> Option<&TfidfVectorizer> {
        self.vectorizer.as_ref()
    }

    /// Fit text features on `normalized` and pair them with metadata from
    /// `documents` (same order).
    pub fn fit_matrix<D: DocumentText>(
        &mut self,
        normalized: &[NormalizedDocument],
        documents: &[D],
    ) -> Result<FeatureMatrix, FeatureExtractionError> {
        let texts = combined_texts(normalized);
        let text = self.extract_text_features(&texts, self.params.max_features)?;
        let metadata = self.extract_metadata_features(documents)?;
        FeatureMatrix::new(text.rows, text.width, metadata, METADATA_WIDTH)
    }

    /// Like [`Self::fit_matrix`] but projecting onto the fitted vocabulary.
    pub fn project_matrix<D: DocumentText>(
        &self,
        normalized: &[NormalizedDocument],
        documents: &[D],
    ) -> Result<FeatureMatrix, FeatureExtractionError> {
        let texts = combined_texts(normalized);
        let text = self.project_text_features(&texts)?;
        if text.out_of_vocabulary_tokens > 0 {
            tracing::debug!(
                out_of_vocabulary = text.out_of_vocabulary_tokens,
                "Projected terms outside the fitted vocabulary"
            );
        }
        let metadata = self.extract_metadata_features(documents)?;
        FeatureMatrix::new(text.rows, text.width, metadata, METADATA_WIDTH)
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(VectorizerParams::default(), LabelOrder::default())
    }
}

fn combined_texts(normalized: &[NormalizedDocument]) -> Vec<String> {
    normalized.iter().map(NormalizedDocument::combined).collect()
}
