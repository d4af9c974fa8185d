//! Nearest-centroid classifier over TF-IDF and standardized metadata.

use crate::error::MlError;
use crate::features::FeatureMatrix;
use crate::training::classifier::TrainableClassifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scales similarity scores before the softmax in `predict_proba`.
const SOFTMAX_SHARPNESS: f64 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentroidParams {
    /// Share of the score taken by metadata similarity, in `[0, 1]`.
    pub metadata_weight: f64,
}

impl Default for CentroidParams {
    fn default() -> Self {
        Self {
            metadata_weight: 0.2,
        }
    }
}

/// Per-class mean vectors; prediction picks the most cosine-similar class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NearestCentroidClassifier {
    params: CentroidParams,
    classes: Vec<String>,
    text_centroids: Vec<Vec<f64>>,
    metadata_centroids: Vec<Vec<f64>>,
    metadata_mean: Vec<f64>,
    metadata_std: Vec<f64>,
}

impl NearestCentroidClassifier {
    pub fn new(params: CentroidParams) -> Result<Self, MlError> {
        if !(0.0..=1.0).contains(&params.metadata_weight) {
            return Err(MlError::classifier(format!(
                "metadata_weight must be in [0, 1], got {}",
                params.metadata_weight
            )));
        }
        Ok(Self {
            params,
            ..Default::default()
        })
    }

    fn is_fitted(&self) -> bool {
        !self.classes.is_empty()
    }

    fn standardize(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.metadata_mean.iter().zip(&self.metadata_std))
            .map(|(x, (mean, std))| (x - mean) / std)
            .collect()
    }

    /// Similarity of `row` to every class centroid, in class order.
    fn scores(&self, features: &FeatureMatrix, row: usize) -> Vec<f64> {
        let meta = self.standardize(&features.metadata[row]);
        let w = self.params.metadata_weight;
        self.text_centroids
            .iter()
            .zip(&self.metadata_centroids)
            .map(|(text_c, meta_c)| {
                (1.0 - w) * cosine_similarity(&features.text[row], text_c)
                    + w * cosine_similarity(&meta, meta_c)
            })
            .collect()
    }

    fn check_ready(&self, features: &FeatureMatrix) -> Result<(), MlError> {
        if !self.is_fitted() {
            return Err(MlError::classifier("Classifier has not been fitted"));
        }
        let expected = self.text_centroids[0].len();
        if features.text_width != expected || features.metadata_width != self.metadata_mean.len() {
            return Err(MlError::classifier(format!(
                "Feature width {}+{} does not match fitted width {}+{}",
                features.text_width,
                features.metadata_width,
                expected,
                self.metadata_mean.len()
            )));
        }
        Ok(())
    }
}

impl TrainableClassifier for NearestCentroidClassifier {
    fn name(&self) -> &str {
        "nearest_centroid"
    }

    fn fit(&mut self, features: &FeatureMatrix, targets: &[String]) -> Result<(), MlError> {
        if features.is_empty() {
            return Err(MlError::classifier("Cannot fit on zero samples"));
        }
        if features.len() != targets.len() {
            return Err(MlError::classifier(format!(
                "{} feature rows but {} targets",
                features.len(),
                targets.len()
            )));
        }

        let (mean, std) = column_stats(&features.metadata, features.metadata_width);
        self.metadata_mean = mean;
        self.metadata_std = std;

        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (row, target) in targets.iter().enumerate() {
            groups.entry(target.as_str()).or_default().push(row);
        }

        self.classes = groups.keys().map(|c| c.to_string()).collect();
        self.text_centroids = groups
            .values()
            .map(|rows| mean_of(rows.iter().map(|&r| features.text[r].clone()), features.text_width))
            .collect();
        self.metadata_centroids = groups
            .values()
            .map(|rows| {
                mean_of(
                    rows.iter().map(|&r| self.standardize(&features.metadata[r])),
                    features.metadata_width,
                )
            })
            .collect();

        tracing::debug!(
            classes = self.classes.len(),
            samples = targets.len(),
            "Fitted nearest-centroid classifier"
        );
        Ok(())
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<String>, MlError> {
        self.check_ready(features)?;
        Ok((0..features.len())
            .map(|row| {
                let scores = self.scores(features, row);
                let best = argmax(&scores);
                self.classes[best].clone()
            })
            .collect())
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<Vec<f64>>, MlError> {
        self.check_ready(features)?;
        Ok((0..features.len())
            .map(|row| softmax(&self.scores(features, row)))
            .collect())
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn export(&self) -> Result<serde_json::Value, MlError> {
        Ok(serde_json::to_value(self)?)
    }
}

fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Column means and population standard deviations; zero spread becomes 1.
fn column_stats(rows: &[Vec<f64>], width: usize) -> (Vec<f64>, Vec<f64>) {
    let n = rows.len() as f64;
    let mean: Vec<f64> = (0..width)
        .map(|c| rows.iter().map(|r| r[c]).sum::<f64>() / n)
        .collect();
    let std = (0..width)
        .map(|c| {
            let var = rows.iter().map(|r| (r[c] - mean[c]).powi(2)).sum::<f64>() / n;
            if var > 0.0 { var.sqrt() } else { 1.0 }
        })
        .collect();
    (mean, std)
}

fn mean_of(rows: impl Iterator<Item = Vec<f64>>, width: usize) -> Vec<f64> {
    let mut sum = vec![0.0; width];
    let mut count = 0usize;
    for row in rows {
        for (s, v) in sum.iter_mut().zip(&row) {
            *s += v;
        }
        count += 1;
    }
    if count > 0 {
        for s in &mut sum {
            *s /= count as f64;
        }
    }
    sum
}

/// Index of the largest value; the first one wins ties.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores
        .iter()
        .map(|s| ((s - max) * SOFTMAX_SHARPNESS).exp())
        .collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
