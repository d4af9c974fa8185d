//! A trained model bundled with the fitted state needed for inference.

use crate::data::DocumentText;
use crate::error::MlError;
use crate::features::FeatureExtractor;
use crate::text::NormalizerChain;
use crate::training::classifier::TrainableClassifier;
use crate::training::policy::LabelPolicy;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Classifier output for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
    /// `(class, probability)` in classifier class order.
    pub probabilities: Vec<(String, f64)>,
}

/// The handle produced by a completed training run.
pub struct TrainedModel {
    pub run_id: Uuid,
    pub policy: LabelPolicy,
    pub classes: Vec<String>,
    normalizer: Arc<NormalizerChain>,
    extractor: FeatureExtractor,
    classifier: Arc<dyn TrainableClassifier>,
}

impl TrainedModel {
    pub fn new(
        run_id: Uuid,
        policy: LabelPolicy,
        classes: Vec<String>,
        normalizer: Arc<NormalizerChain>,
        extractor: FeatureExtractor,
        classifier: Arc<dyn TrainableClassifier>,
    ) -> Self {
        Self {
            run_id,
            policy,
            classes,
            normalizer,
            extractor,
            classifier,
        }
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn classifier(&self) -> &dyn TrainableClassifier {
        self.classifier.as_ref()
    }

    /// Normalize, project onto the frozen feature space and classify.
    pub fn predict<D: DocumentText>(&self, documents: &[D]) -> Result<Vec<Prediction>, MlError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let normalized = self.normalizer.normalize_records(documents);
        let features = self.extractor.project_matrix(&normalized, documents)?;
        let labels = self.classifier.predict(&features)?;
        let probabilities = self.classifier.predict_proba(&features)?;
        let classes = self.classifier.classes();

        Ok(labels
            .into_iter()
            .zip(probabilities)
            .map(|(label, row)| {
                let confidence = classes
                    .iter()
                    .position(|c| *c == label)
                    .and_then(|i| row.get(i).copied())
                    .unwrap_or(0.0);
                Prediction {
                    label,
                    confidence,
                    probabilities: classes.iter().cloned().zip(row).collect(),
                }
            })
            .collect())
    }
}

impl std::fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainedModel")
            .field("run_id", &self.run_id)
            .field("policy", &self.policy)
            .field("classes", &self.classes)
            .field("classifier", &self.classifier.name())
            .field("features", &self.extractor.feature_names().len())
            .finish()
    }
}
