//! Integration tests for the training job state machine.
//!
//! Collaborators are fakes: a source that blocks until released, classifiers
//! that fail or panic at a chosen step, and stores that count or refuse saves.

use async_trait::async_trait;
use medclass_ml::algorithms::NearestCentroidClassifier;
use medclass_ml::data::{
    DataSourceInfo, DataTable, DatasetSource, InMemorySource, LatestCsvSource,
};
use medclass_ml::error::MlError;
use medclass_ml::features::FeatureMatrix;
use medclass_ml::training::{
    ArtifactStore, ClassifierFactory, EvaluationMetrics, FsArtifactStore, JobState, ModelArtifact,
    TrainableClassifier, TrainingJob, TrainingSettings, TrainingStatus,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

fn corpus() -> DataTable {
    DataTable::from_records([
        ("CV outcomes", "Heart failure in adults.", "Cardiovascular"),
        ("Valve repair", "Surgical heart valve outcomes.", "Cardiovascular"),
        ("Stroke after arrest", "Brain injury after cardiac arrest.", "Cardiovascular|Neurological"),
        ("Seizure control", "Epilepsy and brain activity.", "Neurological"),
        ("Tumor growth", "Chemotherapy response rates.", "Oncological"),
        ("Glioma survival", "Brain tumor chemotherapy.", "Oncological|Neurological"),
    ])
}

/// A source whose `load` waits for `release`.
struct GatedSource {
    gate: Notify,
    table: DataTable,
}

impl GatedSource {
    fn new(table: DataTable) -> Arc<Self> {
        Arc::new(Self {
            gate: Notify::new(),
            table,
        })
    }

    fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl DatasetSource for GatedSource {
    async fn load(&self) -> Result<DataTable, MlError> {
        self.gate.notified().await;
        Ok(self.table.clone())
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "gated".to_string(),
            location: "test".to_string(),
            accessed_at: chrono::Utc::now(),
        }
    }
}

#[derive(Default)]
struct CountingStore {
    saves: AtomicUsize,
}

impl ArtifactStore for CountingStore {
    fn save(&self, _: &ModelArtifact, _: &EvaluationMetrics) -> Result<Vec<PathBuf>, MlError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct FailingClassifier;

impl TrainableClassifier for FailingClassifier {
    fn name(&self) -> &str {
        "failing"
    }

    fn fit(&mut self, _: &FeatureMatrix, _: &[String]) -> Result<(), MlError> {
        Err(MlError::classifier("singular matrix"))
    }

    fn predict(&self, _: &FeatureMatrix) -> Result<Vec<String>, MlError> {
        Err(MlError::classifier("not fitted"))
    }

    fn predict_proba(&self, _: &FeatureMatrix) -> Result<Vec<Vec<f64>>, MlError> {
        Err(MlError::classifier("not fitted"))
    }

    fn classes(&self) -> &[String] {
        &[]
    }

    fn export(&self) -> Result<serde_json::Value, MlError> {
        Ok(serde_json::Value::Null)
    }
}

/// A store whose disk is always full.
struct FullDiskStore;

impl ArtifactStore for FullDiskStore {
    fn save(&self, _: &ModelArtifact, _: &EvaluationMetrics) -> Result<Vec<PathBuf>, MlError> {
        Err(MlError::persistence("disk full"))
    }
}

/// Where a [`FaultyClassifier`] breaks after a successful fit.
#[derive(Clone, Copy)]
enum Fault {
    PanicOnPredict,
    ErrOnPredict,
    ErrOnExport,
}

/// Fits like the nearest-centroid classifier, then breaks at `fault`.
struct FaultyClassifier {
    inner: NearestCentroidClassifier,
    fault: Fault,
}

impl TrainableClassifier for FaultyClassifier {
    fn name(&self) -> &str {
        "faulty"
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &[String]) -> Result<(), MlError> {
        self.inner.fit(x, y)
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<String>, MlError> {
        match self.fault {
            Fault::PanicOnPredict => panic!("centroid table corrupted"),
            Fault::ErrOnPredict => Err(MlError::dataset("feature width mismatch")),
            Fault::ErrOnExport => self.inner.predict(x),
        }
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<Vec<f64>>, MlError> {
        self.inner.predict_proba(x)
    }

    fn classes(&self) -> &[String] {
        self.inner.classes()
    }

    fn export(&self) -> Result<serde_json::Value, MlError> {
        match self.fault {
            Fault::ErrOnExport => {
                let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
                Err(MlError::Serde(err))
            }
            _ => self.inner.export(),
        }
    }
}

fn faulty(fault: Fault) -> ClassifierFactory {
    Arc::new(move || {
        Box::new(FaultyClassifier {
            inner: NearestCentroidClassifier::default(),
            fault,
        }) as Box<dyn TrainableClassifier>
    })
}

/// A source whose `load` panics.
struct PanickingSource;

#[async_trait]
impl DatasetSource for PanickingSource {
    async fn load(&self) -> Result<DataTable, MlError> {
        panic!("reader poisoned")
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "panicking".to_string(),
            location: "test".to_string(),
            accessed_at: chrono::Utc::now(),
        }
    }
}

fn in_memory_job(factory: ClassifierFactory, store: Arc<dyn ArtifactStore>) -> TrainingJob {
    TrainingJob::new(
        Arc::new(InMemorySource::new(corpus())),
        factory,
        store,
        TrainingSettings::default(),
    )
}

fn centroid() -> ClassifierFactory {
    Arc::new(|| Box::new(NearestCentroidClassifier::default()) as Box<dyn TrainableClassifier>)
}

/// Block until the run has logged `step`.
async fn wait_for_step(job: &TrainingJob, step: &str) -> Arc<TrainingStatus> {
    let mut rx = job.subscribe();
    let status = rx
        .wait_for(|s| s.current_step == step)
        .await
        .expect("status board dropped");
    Arc::clone(&status)
}

#[tokio::test]
async fn test_second_start_is_rejected_and_keeps_logs() {
    let source = GatedSource::new(corpus());
    let job = TrainingJob::new(
        source.clone(),
        centroid(),
        Arc::new(CountingStore::default()),
        TrainingSettings::default(),
    );

    let first = job.start().await.unwrap();
    let before = wait_for_step(&job, "load").await;

    let err = job.start().await.unwrap_err();
    assert!(matches!(err, MlError::JobAlreadyRunning { run_id } if run_id == first));
    let after = job.status();
    assert_eq!(after.run_id, Some(first));
    assert_eq!(after.logs, before.logs);
    assert!(after.is_running);

    source.release();
    let done = job.wait().await;
    assert_eq!(done.state, JobState::Completed);
    assert_eq!(done.run_id, Some(first));
    assert_eq!(done.logs[0], before.logs[0]);
}

#[tokio::test]
async fn test_fit_failure_rolls_progress_back() {
    let store = Arc::new(CountingStore::default());
    let factory: ClassifierFactory =
        Arc::new(|| Box::new(FailingClassifier) as Box<dyn TrainableClassifier>);
    let job = TrainingJob::new(
        Arc::new(InMemorySource::new(corpus())),
        factory,
        store.clone(),
        TrainingSettings::default(),
    );

    job.start().await.unwrap();
    let status = job.wait().await;

    assert_eq!(status.state, JobState::Failed);
    assert!(!status.is_running);
    assert_eq!(status.progress, 40);
    assert_eq!(status.current_step, "failed");
    assert!(status.error.as_deref().unwrap().contains("singular matrix"));
    assert!(status.metrics.is_none());
    assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    assert!(job.trained_model().is_none());
}

#[tokio::test]
async fn test_stop_halts_before_persist() {
    let source = GatedSource::new(corpus());
    let store = Arc::new(CountingStore::default());
    let job = TrainingJob::new(
        source.clone(),
        centroid(),
        store.clone(),
        TrainingSettings::default(),
    );

    let run_id = job.start().await.unwrap();
    wait_for_step(&job, "load").await;
    assert_eq!(job.stop().await.unwrap(), run_id);

    let stopped = job.status();
    assert_eq!(stopped.state, JobState::Stopped);
    assert_eq!(stopped.current_step, "stopped");
    assert_eq!(stopped.progress, 10);

    source.release();
    let finished = job.wait().await;
    assert_eq!(finished.state, JobState::Stopped);
    assert_eq!(finished.logs, stopped.logs);
    assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    assert!(job.trained_model().is_none());
    assert!(matches!(job.stop().await, Err(MlError::JobNotRunning)));
}

#[tokio::test]
async fn test_restart_after_stop() {
    let source = GatedSource::new(corpus());
    let job = TrainingJob::new(
        source.clone(),
        centroid(),
        Arc::new(CountingStore::default()),
        TrainingSettings::default(),
    );

    job.start().await.unwrap();
    wait_for_step(&job, "load").await;
    job.stop().await.unwrap();
    source.release();
    job.wait().await;

    let second = job.start().await.unwrap();
    source.release();
    let status = job.wait().await;
    assert_eq!(status.run_id, Some(second));
    assert_eq!(status.state, JobState::Completed);
    assert_eq!(status.logs.first().map(|l| l.step.as_str()), Some("load"));
}

#[tokio::test]
async fn test_full_run_writes_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(
        data_dir.join("corpus.csv"),
        "title;abstract;group\n\
         CV outcomes;Heart failure in adults.;Cardiovascular\n\
         Valve repair;Surgical heart valve outcomes.;Cardiovascular\n\
         \"Stroke; after arrest\";Brain injury after cardiac arrest.;Cardiovascular|Neurological\n\
         Seizure control;Epilepsy and brain activity.;Neurological\n\
         Tumor growth;Chemotherapy response rates.;Oncological\n\
         Glioma survival;Brain tumor chemotherapy.;Oncological|Neurological\n",
    )
    .unwrap();

    let store = Arc::new(FsArtifactStore::new(
        dir.path().join("models"),
        dir.path().join("results"),
    ));
    let job = TrainingJob::new(
        Arc::new(LatestCsvSource::new(&data_dir, ';')),
        centroid(),
        store.clone(),
        TrainingSettings::default(),
    );

    let run_id = job.start().await.unwrap();
    let status = job.wait().await;
    assert_eq!(status.state, JobState::Completed, "{:?}", status.error);

    let metrics = status.metrics.as_ref().unwrap();
    assert_eq!(
        metrics.classes,
        vec!["Cardiovascular", "Neurological", "Oncological"]
    );
    assert_eq!(metrics.confusion_matrix.len(), 3);
    assert_eq!(metrics.training_samples, 4);
    assert_eq!(metrics.test_samples, 2);

    let model = store.load_model().unwrap().unwrap();
    assert_eq!(model.run_id, run_id);
    assert_eq!(model.classifier_name, "nearest_centroid");
    assert_eq!(model.label_vocabulary.len(), 3);
    assert_eq!(model.feature_names.len(), model.idf.len());
    assert_eq!(model.corpus_sha256.len(), 64);
    let saved = store.load_metrics().unwrap().unwrap();
    assert_eq!(saved.confusion_matrix, metrics.confusion_matrix);
    assert!((saved.accuracy - metrics.accuracy).abs() < 1e-12);
}

#[tokio::test]
async fn test_predict_panic_fails_run_and_allows_restart() {
    let store = Arc::new(CountingStore::default());
    let job = in_memory_job(faulty(Fault::PanicOnPredict), store.clone());

    let first = job.start().await.unwrap();
    let status = job.wait().await;
    assert_eq!(status.run_id, Some(first));
    assert_eq!(status.state, JobState::Failed);
    assert!(!status.is_running);
    assert_eq!(status.progress, 70);
    assert_eq!(status.current_step, "failed");
    let error = status.error.as_deref().unwrap();
    assert!(error.starts_with("Classifier error"), "{error}");
    assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    assert!(job.trained_model().is_none());

    let second = job.start().await.unwrap();
    assert_ne!(second, first);
    let status = job.wait().await;
    assert_eq!(status.run_id, Some(second));
    assert_eq!(status.state, JobState::Failed);
}

#[tokio::test]
async fn test_predict_error_rolls_back_to_fit() {
    let store = Arc::new(CountingStore::default());
    let job = in_memory_job(faulty(Fault::ErrOnPredict), store.clone());

    job.start().await.unwrap();
    let status = job.wait().await;

    assert_eq!(status.state, JobState::Failed);
    assert_eq!(status.progress, 70);
    assert_eq!(
        status.error.as_deref(),
        Some("Classifier error: Dataset error: feature width mismatch")
    );
    assert!(status.metrics.is_none());
    assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    assert!(job.trained_model().is_none());
}

#[tokio::test]
async fn test_export_error_reported_as_classifier_error() {
    let store = Arc::new(CountingStore::default());
    let job = in_memory_job(faulty(Fault::ErrOnExport), store.clone());

    job.start().await.unwrap();
    let status = job.wait().await;

    assert_eq!(status.state, JobState::Failed);
    assert_eq!(status.progress, 90);
    let error = status.error.as_deref().unwrap();
    assert!(error.starts_with("Classifier error: Serialization error"), "{error}");
    assert_eq!(store.saves.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_persist_failure_rolls_back_to_evaluate() {
    let job = in_memory_job(centroid(), Arc::new(FullDiskStore));

    job.start().await.unwrap();
    let status = job.wait().await;

    assert_eq!(status.state, JobState::Failed);
    assert!(!status.is_running);
    assert_eq!(status.progress, 90);
    assert_eq!(status.error.as_deref(), Some("Persistence error: disk full"));
    assert!(status.metrics.is_none());
    assert!(job.trained_model().is_none());
    let steps: Vec<&str> = status.logs.iter().map(|l| l.step.as_str()).collect();
    assert_eq!(
        steps,
        vec!["load", "normalize", "extract_features", "fit", "evaluate", "persist", "failed"]
    );
}

#[tokio::test]
async fn test_source_panic_fails_run() {
    let job = TrainingJob::new(
        Arc::new(PanickingSource),
        centroid(),
        Arc::new(CountingStore::default()),
        TrainingSettings::default(),
    );

    job.start().await.unwrap();
    let status = job.wait().await;

    assert_eq!(status.state, JobState::Failed);
    assert!(!status.is_running);
    assert_eq!(status.progress, 0);
    let error = status.error.as_deref().unwrap();
    assert!(error.starts_with("Training task aborted"), "{error}");
    assert!(job.start().await.is_ok());
}
