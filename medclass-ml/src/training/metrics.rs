//! Evaluation metrics for a held-out partition.

use serde::{Deserialize, Serialize};

/// Per-class precision/recall/F1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub class: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Evaluation results.
///
/// `confusion_matrix[i][j]` counts samples of true class `classes[i]`
/// predicted as `classes[j]`. `precision`, `recall` and `f1_score` are
/// support-weighted averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub confusion_matrix: Vec<Vec<usize>>,
    pub classes: Vec<String>,
    pub training_samples: usize,
    pub test_samples: usize,
    pub precision_macro: f64,
    pub recall_macro: f64,
    pub f1_macro: f64,
    pub per_class: Vec<ClassReport>,
}

/// Score `predicted` against `truth` over the canonical `classes` list.
///
/// Pairs whose label is not in `classes` count toward accuracy but not the
/// matrix. Any zero division yields 0.
pub fn evaluate(
    truth: &[String],
    predicted: &[String],
    classes: &[String],
    training_samples: usize,
) -> EvaluationMetrics {
    let k = classes.len();
    let index = |label: &str| classes.iter().position(|c| c == label);

    let mut confusion = vec![vec![0usize; k]; k];
    let mut correct = 0;
    for (t, p) in truth.iter().zip(predicted) {
        if t == p {
            correct += 1;
        }
        match (index(t.as_str()), index(p.as_str())) {
            (Some(i), Some(j)) => confusion[i][j] += 1,
            _ => tracing::warn!(truth = %t, predicted = %p, "Label outside the class list"),
        }
    }
    let total = truth.len().min(predicted.len());

    let per_class: Vec<ClassReport> = classes
        .iter()
        .enumerate()
        .map(|(i, class)| {
            let tp = confusion[i][i];
            let support: usize = confusion[i].iter().sum();
            let predicted_count: usize = confusion.iter().map(|row| row[i]).sum();
            let precision = ratio(tp, predicted_count);
            let recall = ratio(tp, support);
            ClassReport {
                class: class.clone(),
                precision,
                recall,
                f1_score: f1(precision, recall),
                support,
            }
        })
        .collect();

    EvaluationMetrics {
        accuracy: ratio(correct, total),
        precision: weighted_avg(&per_class, |c| c.precision),
        recall: weighted_avg(&per_class, |c| c.recall),
        f1_score: weighted_avg(&per_class, |c| c.f1_score),
        confusion_matrix: confusion,
        classes: classes.to_vec(),
        training_samples,
        test_samples: total,
        precision_macro: macro_avg(&per_class, |c| c.precision),
        recall_macro: macro_avg(&per_class, |c| c.recall),
        f1_macro: macro_avg(&per_class, |c| c.f1_score),
        per_class,
    }
}

fn weighted_avg(reports: &[ClassReport], value: impl Fn(&ClassReport) -> f64) -> f64 {
    let total_support: usize = reports.iter().map(|c| c.support).sum();
    if total_support == 0 {
        return 0.0;
    }
    reports
        .iter()
        .map(|c| value(c) * c.support as f64)
        .sum::<f64>()
        / total_support as f64
}

fn macro_avg(reports: &[ClassReport], value: impl Fn(&ClassReport) -> f64) -> f64 {
    if reports.is_empty() {
        0.0
    } else {
        reports.iter().map(value).sum::<f64>() / reports.len() as f64
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_perfect_predictions() {
        let classes = labels(&["A", "B"]);
        let y = labels(&["A", "B", "B"]);
        let m = evaluate(&y, &y, &classes, 10);
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.f1_score, 1.0);
        assert_eq!(m.confusion_matrix, vec![vec![1, 0], vec![0, 2]]);
        assert_eq!(m.training_samples, 10);
        assert_eq!(m.test_samples, 3);
    }

    #[test]
    fn test_weighted_averages() {
        let classes = labels(&["A", "B"]);
        let truth = labels(&["A", "A", "A", "B"]);
        let pred = labels(&["A", "A", "B", "B"]);
        let m = evaluate(&truth, &pred, &classes, 4);
        assert_eq!(m.accuracy, 0.75);
        // A: p=1, r=2/3; B: p=1/2, r=1
        let expected_precision = (3.0 * 1.0 + 1.0 * 0.5) / 4.0;
        assert!((m.precision - expected_precision).abs() < 1e-12);
        assert!((m.recall - 0.75).abs() < 1e-12);
        assert!((m.precision_macro - 0.75).abs() < 1e-12);
        assert_eq!(m.confusion_matrix, vec![vec![2, 1], vec![0, 1]]);
    }

    #[test]
    fn test_unseen_class_has_zero_row() {
        let classes = labels(&["Cardiovascular", "Neurological", "Oncological"]);
        let m = evaluate(
            &labels(&["Oncological"]),
            &labels(&["Cardiovascular"]),
            &classes,
            2,
        );
        assert_eq!(m.confusion_matrix.len(), 3);
        assert!(m.confusion_matrix.iter().all(|r| r.len() == 3));
        assert_eq!(m.confusion_matrix[2][0], 1);
        assert_eq!(m.accuracy, 0.0);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.per_class[1].support, 0);
    }

    #[test]
    fn test_empty_evaluation_is_zero() {
        let m = evaluate(&[], &[], &labels(&["A"]), 0);
        assert_eq!(m.accuracy, 0.0);
        assert_eq!(m.f1_score, 0.0);
    }

    #[test]
    fn test_serialized_contract_fields() {
        let m = evaluate(&labels(&["A"]), &labels(&["A"]), &labels(&["A"]), 1);
        let json = serde_json::to_value(&m).unwrap();
        for field in [
            "accuracy",
            "precision",
            "recall",
            "f1_score",
            "confusion_matrix",
            "classes",
            "training_samples",
            "test_samples",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
    }
}
