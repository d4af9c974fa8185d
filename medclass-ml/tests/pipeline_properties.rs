//! Property-based and scenario tests for the text-to-feature pipeline.

use proptest::prelude::*;
use std::collections::BTreeSet;

use medclass_ml::algorithms::NearestCentroidClassifier;
use medclass_ml::data::{Document, split_labels};
use medclass_ml::features::{FeatureExtractor, METADATA_WIDTH, metadata_row};
use medclass_ml::text::NormalizerChain;
use medclass_ml::training::{LabelPolicy, TrainableClassifier, evaluate};

fn word() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z]{1,10}",
        "[0-9]{1,4}",
        Just("CV".to_string()),
        Just("mi".to_string()),
        Just("COPD".to_string()),
        Just("the".to_string()),
        Just("And".to_string()),
        "[.,;:()!?-]{1,3}",
    ]
}

fn sentence() -> impl Strategy<Value = String> {
    prop::collection::vec(word(), 0..20).prop_map(|words| words.join(" "))
}

fn label() -> impl Strategy<Value = String> {
    ("[ ]{0,2}", "[A-Z][a-z]{2,8}", "[ ]{0,2}").prop_map(|(l, w, r)| format!("{l}{w}{r}"))
}

fn group() -> impl Strategy<Value = String> {
    prop::collection::vec(label(), 1..4).prop_map(|labels| labels.join("|"))
}

// --- Normalizer properties ---

proptest! {
    #[test]
    fn normalizer_is_idempotent(text in sentence()) {
        let chain = NormalizerChain::default();
        let once = chain.normalize(&text);
        prop_assert_eq!(chain.normalize(&once), once);
    }

    #[test]
    fn normalizer_output_is_lowercase_single_spaced(text in sentence()) {
        let out = NormalizerChain::default().normalize(&text);
        prop_assert_eq!(out.to_lowercase(), out.clone());
        prop_assert!(!out.contains("  "));
        prop_assert_eq!(out.trim(), out.as_str());
    }
}

// --- Metadata properties ---

proptest! {
    #[test]
    fn metadata_has_one_nonnegative_row_per_document(
        texts in prop::collection::vec((sentence(), sentence()), 1..12)
    ) {
        let docs: Vec<Document> = texts
            .iter()
            .enumerate()
            .map(|(i, (t, a))| Document::from_group(i, t.as_str(), a.as_str(), "Cardiovascular"))
            .collect();
        let rows = FeatureExtractor::default().extract_metadata_features(&docs).unwrap();

        prop_assert_eq!(rows.len(), docs.len());
        for (row, doc) in rows.iter().zip(&docs) {
            prop_assert_eq!(row.len(), METADATA_WIDTH);
            prop_assert!(row.iter().all(|v| *v >= 0.0));
            prop_assert_eq!(row, &metadata_row(doc));
        }
    }
}

// --- Label encoding properties ---

proptest! {
    #[test]
    fn label_round_trip_reproduces_trimmed_set(groups in prop::collection::vec(group(), 1..10)) {
        let mut extractor = FeatureExtractor::default();
        let matrix = extractor.encode_labels(&groups).unwrap();
        prop_assert_eq!(matrix.len(), groups.len());

        for (row, group) in matrix.iter().zip(&groups) {
            let decoded: BTreeSet<String> =
                extractor.decode_labels(row).unwrap().into_iter().collect();
            let expected: BTreeSet<String> = split_labels(group).into_iter().collect();
            prop_assert_eq!(decoded, expected);
        }
    }
}

// --- Scenarios ---

fn three_documents() -> Vec<Document> {
    vec![
        Document::from_group(0, "CV outcomes", "Heart failure in adults.", "Cardiovascular"),
        Document::from_group(
            1,
            "Stroke after cardiac arrest",
            "Brain injury in survivors.",
            "Cardiovascular|Neurological",
        ),
        Document::from_group(2, "Tumor growth", "Chemotherapy response rates.", "Oncological"),
    ]
}

#[test]
fn test_cv_disease_study_normalization() {
    let chain = NormalizerChain::default();
    assert_eq!(chain.normalize("CV Disease Study"), "cardiovascular disease study");
}

#[test]
fn test_three_document_scenario() {
    let docs = three_documents();
    let chain = NormalizerChain::default();
    let normalized = chain.normalize_documents(&docs);

    let mut extractor = FeatureExtractor::default();
    let groups: Vec<String> = docs.iter().map(Document::group).collect();
    let labels = extractor.encode_labels(&groups).unwrap();
    assert_eq!(labels.len(), 3);
    assert_eq!(
        extractor.label_names(),
        ["Cardiovascular", "Neurological", "Oncological"]
    );

    let features = extractor.fit_matrix(&normalized, &docs).unwrap();
    assert_eq!(features.len(), 3);

    let policy = LabelPolicy::FirstLabel;
    let targets: Vec<String> = docs.iter().map(|d| policy.target(&d.labels)).collect();
    let classes = policy.canonical_classes(&targets, extractor.label_names());

    let mut classifier = NearestCentroidClassifier::default();
    classifier.fit(&features, &targets).unwrap();
    let test = features.select(&[2]);
    let predicted = classifier.predict(&test).unwrap();
    let metrics = evaluate(&targets[2..], &predicted, &classes, 2);

    assert_eq!(metrics.classes, vec!["Cardiovascular", "Neurological", "Oncological"]);
    assert_eq!(metrics.confusion_matrix.len(), 3);
    assert!(metrics.confusion_matrix.iter().all(|row| row.len() == 3));
    assert_eq!(metrics.test_samples, 1);
}

#[test]
fn test_projection_keeps_fitted_width() {
    let docs = three_documents();
    let chain = NormalizerChain::default();
    let mut extractor = FeatureExtractor::default();
    let fitted = extractor
        .fit_matrix(&chain.normalize_documents(&docs), &docs)
        .unwrap();

    let unseen = vec![Document::from_group(0, "Unrelated words", "Nothing shared here.", "x")];
    let projected = extractor
        .project_matrix(&chain.normalize_documents(&unseen), &unseen)
        .unwrap();
    assert_eq!(projected.text_width, fitted.text_width);
    assert!(projected.text[0].iter().all(|v| *v == 0.0));
}
