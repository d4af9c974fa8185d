//! The trainable-classifier capability consumed by the training job.

use crate::error::MlError;
use crate::features::FeatureMatrix;
use std::sync::Arc;

/// A single-label classifier over [`FeatureMatrix`] rows.
///
/// Implementations must be deterministic: the same inputs always produce the
/// same fitted state and predictions.
pub trait TrainableClassifier: Send + Sync {
    /// Identifier recorded in exported artifacts.
    fn name(&self) -> &str;

    fn fit(&mut self, features: &FeatureMatrix, targets: &[String]) -> Result<(), MlError>;

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<String>, MlError>;

    /// One probability row per sample, columns in [`Self::classes`] order.
    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<Vec<f64>>, MlError>;

    /// Classes seen during `fit`.
    fn classes(&self) -> &[String];

    /// Serializable snapshot of the fitted parameters.
    fn export(&self) -> Result<serde_json::Value, MlError>;
}

/// Produces a fresh, unfitted classifier for each training run.
pub type ClassifierFactory = Arc<dyn Fn() -> Box<dyn TrainableClassifier> + Send + Sync>;
