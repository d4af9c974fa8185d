//! Persisted outputs of a training run.

use crate::data::Document;
use crate::error::MlError;
use crate::features::{FeatureExtractor, VectorizerParams};
use crate::persistence::{atomic_write_json, load_json};
use crate::training::metrics::EvaluationMetrics;
use crate::training::policy::LabelPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use uuid::Uuid;

pub const MODEL_FILE: &str = "model.json";
pub const METRICS_FILE: &str = "metrics.json";

/// Everything needed to rebuild the feature space and classifier of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub classifier_name: String,
    pub classifier: serde_json::Value,
    pub vectorizer: VectorizerParams,
    pub feature_names: Vec<String>,
    pub idf: Vec<f64>,
    pub metadata_features: Vec<String>,
    pub label_vocabulary: Vec<String>,
    pub classes: Vec<String>,
    pub label_policy: LabelPolicy,
    /// SHA-256 of the training corpus, see [`corpus_fingerprint`].
    pub corpus_sha256: String,
    pub training_samples: usize,
}

impl ModelArtifact {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: Uuid,
        classifier_name: &str,
        classifier: serde_json::Value,
        extractor: &FeatureExtractor,
        classes: Vec<String>,
        label_policy: LabelPolicy,
        corpus_sha256: String,
        training_samples: usize,
    ) -> Self {
        let (vectorizer, idf) = match extractor.vectorizer() {
            Some(v) => (v.params().clone(), v.idf().to_vec()),
            None => (VectorizerParams::default(), Vec::new()),
        };
        Self {
            run_id,
            created_at: Utc::now(),
            classifier_name: classifier_name.to_string(),
            classifier,
            vectorizer,
            feature_names: extractor.feature_names(),
            idf,
            metadata_features: extractor
                .metadata_feature_names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            label_vocabulary: extractor.label_names().to_vec(),
            classes,
            label_policy,
            corpus_sha256,
            training_samples,
        }
    }
}

/// Hex SHA-256 over every document's title, abstract and raw group.
pub fn corpus_fingerprint(documents: &[Document]) -> String {
    let mut hasher = Sha256::new();
    for doc in documents {
        hasher.update(doc.title.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(doc.abstract_text.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(doc.group().as_bytes());
        hasher.update(b"\x1e");
    }
    format!("{:x}", hasher.finalize())
}

/// Where run outputs are written.
pub trait ArtifactStore: Send + Sync {
    /// Persist model and metrics; returns the written paths.
    fn save(&self, model: &ModelArtifact, metrics: &EvaluationMetrics) -> Result<Vec<PathBuf>, MlError>;
}

/// Writes `<models_dir>/model.json` and `<results_dir>/metrics.json`.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    models_dir: PathBuf,
    results_dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(models_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            results_dir: results_dir.into(),
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join(MODEL_FILE)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.results_dir.join(METRICS_FILE)
    }

    pub fn load_model(&self) -> Result<Option<ModelArtifact>, MlError> {
        load_json(&self.model_path())
    }

    pub fn load_metrics(&self) -> Result<Option<EvaluationMetrics>, MlError> {
        load_json(&self.metrics_path())
    }
}

impl ArtifactStore for FsArtifactStore {
    fn save(&self, model: &ModelArtifact, metrics: &EvaluationMetrics) -> Result<Vec<PathBuf>, MlError> {
        let model_path = self.model_path();
        let metrics_path = self.metrics_path();
        atomic_write_json(&model_path, model)?;
        atomic_write_json(&metrics_path, metrics)?;
        tracing::info!(
            run_id = %model.run_id,
            model = %model_path.display(),
            metrics = %metrics_path.display(),
            "Saved training artifacts"
        );
        Ok(vec![model_path, metrics_path])
    }
}
