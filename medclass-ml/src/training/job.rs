//! The training job: one background run at a time, driven step by step and
//! published through a [`StatusBoard`].

use crate::data::{Document, DatasetSource, TrainTestSplit, validate_table};
use crate::error::MlError;
use crate::features::{FeatureExtractor, LabelOrder, VectorizerParams};
use crate::text::NormalizerChain;
use crate::training::artifacts::{ArtifactStore, ModelArtifact, corpus_fingerprint};
use crate::training::classifier::{ClassifierFactory, TrainableClassifier};
use crate::training::metrics::{EvaluationMetrics, evaluate};
use crate::training::model::TrainedModel;
use crate::training::policy::LabelPolicy;
use crate::training::status::{StatusBoard, Step, TrainingStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Knobs for one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSettings {
    pub vectorizer: VectorizerParams,
    pub label_order: LabelOrder,
    pub label_policy: LabelPolicy,
    pub test_ratio: f64,
    pub seed: u64,
    /// Added to the default abbreviation dictionary.
    pub abbreviations: BTreeMap<String, String>,
    /// Added to the default stop-word set of the normalizer.
    pub extra_stop_words: Vec<String>,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            vectorizer: VectorizerParams::default(),
            label_order: LabelOrder::Sorted,
            label_policy: LabelPolicy::FirstLabel,
            test_ratio: 0.2,
            seed: 42,
            abbreviations: BTreeMap::new(),
            extra_stop_words: Vec::new(),
        }
    }
}

impl TrainingSettings {
    pub fn normalizer(&self) -> NormalizerChain {
        NormalizerChain::with_additions(
            self.abbreviations
                .iter()
                .map(|(abbr, full)| (abbr.as_str(), full.as_str())),
            &self.extra_stop_words,
        )
    }
}

struct RunHandle {
    run_id: Uuid,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

struct JobShared {
    board: StatusBoard,
    source: Arc<dyn DatasetSource>,
    classifier_factory: ClassifierFactory,
    store: Arc<dyn ArtifactStore>,
    settings: TrainingSettings,
    model: watch::Sender<Option<Arc<TrainedModel>>>,
}

/// Controls the single training run.
///
/// `start` returns as soon as the run is spawned; progress and failures are
/// observed through [`TrainingJob::status`] or [`TrainingJob::subscribe`].
pub struct TrainingJob {
    shared: Arc<JobShared>,
    current: Mutex<Option<RunHandle>>,
}

impl TrainingJob {
    pub fn new(
        source: Arc<dyn DatasetSource>,
        classifier_factory: ClassifierFactory,
        store: Arc<dyn ArtifactStore>,
        settings: TrainingSettings,
    ) -> Self {
        let (model, _rx) = watch::channel(None);
        Self {
            shared: Arc::new(JobShared {
                board: StatusBoard::new(),
                source,
                classifier_factory,
                store,
                settings,
                model,
            }),
            current: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &TrainingSettings {
        &self.shared.settings
    }

    /// Begin a new run; fails with [`MlError::JobAlreadyRunning`] while one is
    /// in flight.
    pub async fn start(&self) -> Result<Uuid, MlError> {
        let mut current = self.current.lock().await;
        let run_id = Uuid::new_v4();
        self.shared.board.begin(run_id)?;

        let cancel = CancellationToken::new();
        let shared = Arc::clone(&self.shared);
        let token = cancel.clone();
        let task = tokio::spawn(async move { shared.run(run_id, token).await });

        *current = Some(RunHandle {
            run_id,
            cancel,
            task: Some(task),
        });
        tracing::info!(%run_id, source = %self.shared.source.source_info().location, "Training run started");
        Ok(run_id)
    }

    /// Flag the running job as stopped. The pipeline halts at the next step
    /// boundary; a step already executing is not interrupted.
    pub async fn stop(&self) -> Result<Uuid, MlError> {
        let current = self.current.lock().await;
        let run_id = self.shared.board.stop()?;
        if let Some(handle) = current.as_ref().filter(|h| h.run_id == run_id) {
            handle.cancel.cancel();
        }
        tracing::info!(%run_id, "Training run stopped");
        Ok(run_id)
    }

    /// Current status snapshot; never blocks on the run.
    pub fn status(&self) -> Arc<TrainingStatus> {
        self.shared.board.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<TrainingStatus>> {
        self.shared.board.subscribe()
    }

    /// Wait for the latest run's task to finish and return the final status.
    pub async fn wait(&self) -> Arc<TrainingStatus> {
        let task = {
            let mut current = self.current.lock().await;
            current.as_mut().and_then(|h| h.task.take())
        };
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Training task ended abnormally");
            }
        }
        self.status()
    }

    /// Model of the most recent completed run.
    pub fn trained_model(&self) -> Option<Arc<TrainedModel>> {
        self.shared.model.borrow().clone()
    }
}

/// What a pipeline produced when it ran to the end.
struct Outcome {
    model: TrainedModel,
    metrics: EvaluationMetrics,
}

impl JobShared {
    /// Drive one run to a terminal status. The pipeline runs as its own task
    /// so that a panic anywhere in it still ends the run as `Failed`.
    async fn run(self: Arc<Self>, run_id: Uuid, cancel: CancellationToken) {
        let completed = Arc::new(AtomicU8::new(0));
        let pipeline = tokio::spawn({
            let shared = Arc::clone(&self);
            let completed = Arc::clone(&completed);
            async move { shared.pipeline(run_id, &cancel, &completed).await }
        });
        let result = match pipeline.await {
            Ok(result) => result,
            Err(e) => Err(MlError::Aborted(e.to_string())),
        };
        match result {
            Ok(Some(Outcome { model, metrics })) => {
                let accuracy = metrics.accuracy;
                if self.board.complete(run_id, metrics) {
                    self.model.send_replace(Some(Arc::new(model)));
                    tracing::info!(%run_id, accuracy, "Training run completed");
                }
            }
            Ok(None) => {
                let progress = completed.load(Ordering::Acquire);
                tracing::info!(%run_id, progress, "Training run halted after stop");
            }
            Err(e) => {
                let progress = completed.load(Ordering::Acquire);
                if self.board.fail(run_id, e.to_string(), progress) {
                    tracing::error!(%run_id, error = %e, progress, "Training run failed");
                }
            }
        }
    }

    /// Enter `step` unless the run was stopped.
    fn enter(&self, run_id: Uuid, step: Step, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() || !self.board.enter_step(run_id, step) {
            return false;
        }
        tracing::info!(%run_id, step = step.name(), progress = step.progress(), "Training step");
        true
    }

    /// Run every step; `Ok(None)` means the run was stopped between steps.
    /// `completed` holds the progress of the last step that finished.
    async fn pipeline(
        &self,
        run_id: Uuid,
        cancel: &CancellationToken,
        completed: &AtomicU8,
    ) -> Result<Option<Outcome>, MlError> {
        let settings = &self.settings;

        if !self.enter(run_id, Step::Load, cancel) {
            return Ok(None);
        }
        let table = self.source.load().await?;
        let documents = validate_table(&table)?;
        tracing::debug!(%run_id, rows = documents.len(), "Corpus validated");
        completed.store(Step::Load.progress(), Ordering::Release);

        if !self.enter(run_id, Step::Normalize, cancel) {
            return Ok(None);
        }
        let normalizer = Arc::new(settings.normalizer());
        let normalized = normalizer.normalize_documents(&documents);
        completed.store(Step::Normalize.progress(), Ordering::Release);

        if !self.enter(run_id, Step::ExtractFeatures, cancel) {
            return Ok(None);
        }
        let split = TrainTestSplit::new(documents.len(), settings.test_ratio, settings.seed)?;
        let mut extractor = FeatureExtractor::new(settings.vectorizer.clone(), settings.label_order);
        let groups: Vec<String> = documents.iter().map(Document::group).collect();
        extractor.encode_labels(&groups)?;

        let train_docs = TrainTestSplit::select(&documents, &split.train);
        let test_docs = TrainTestSplit::select(&documents, &split.test);
        let train_x = extractor.fit_matrix(&TrainTestSplit::select(&normalized, &split.train), &train_docs)?;
        let test_x = extractor.project_matrix(&TrainTestSplit::select(&normalized, &split.test), &test_docs)?;

        let targets: Vec<String> = documents
            .iter()
            .map(|d| settings.label_policy.target(&d.labels))
            .collect();
        let classes = settings
            .label_policy
            .canonical_classes(&targets, extractor.label_names());
        let train_y = TrainTestSplit::select(&targets, &split.train);
        let test_y = TrainTestSplit::select(&targets, &split.test);
        tracing::debug!(
            %run_id,
            train = split.train.len(),
            test = split.test.len(),
            width = train_x.text_width,
            classes = classes.len(),
            "Features extracted"
        );
        completed.store(Step::ExtractFeatures.progress(), Ordering::Release);

        if !self.enter(run_id, Step::Fit, cancel) {
            return Ok(None);
        }
        let mut classifier = (self.classifier_factory)();
        let classifier = tokio::task::spawn_blocking(move || {
            classifier.fit(&train_x, &train_y).map(|()| classifier)
        })
        .await
        .map_err(|e| MlError::classifier(format!("Classifier fit aborted: {e}")))?
        .map_err(classifier_error)?;
        let classifier: Arc<dyn TrainableClassifier> = Arc::from(classifier);
        completed.store(Step::Fit.progress(), Ordering::Release);

        if !self.enter(run_id, Step::Evaluate, cancel) {
            return Ok(None);
        }
        let predicted = {
            let classifier = Arc::clone(&classifier);
            tokio::task::spawn_blocking(move || classifier.predict(&test_x))
                .await
                .map_err(|e| MlError::classifier(format!("Classifier evaluation aborted: {e}")))?
                .map_err(classifier_error)?
        };
        let metrics = evaluate(&test_y, &predicted, &classes, split.train.len());
        completed.store(Step::Evaluate.progress(), Ordering::Release);

        if !self.enter(run_id, Step::Persist, cancel) {
            return Ok(None);
        }
        let (extractor, metrics) = {
            let classifier = Arc::clone(&classifier);
            let store = Arc::clone(&self.store);
            let classes = classes.clone();
            let label_policy = settings.label_policy;
            let fingerprint = corpus_fingerprint(&train_docs);
            let training_samples = split.train.len();
            tokio::task::spawn_blocking(move || -> Result<_, MlError> {
                let exported = classifier.export().map_err(classifier_error)?;
                let artifact = ModelArtifact::new(
                    run_id,
                    classifier.name(),
                    exported,
                    &extractor,
                    classes,
                    label_policy,
                    fingerprint,
                    training_samples,
                );
                store.save(&artifact, &metrics)?;
                Ok((extractor, metrics))
            })
            .await
            .map_err(|e| MlError::persistence(format!("Persist aborted: {e}")))??
        };
        completed.store(Step::Persist.progress(), Ordering::Release);

        let model = TrainedModel::new(
            run_id,
            settings.label_policy,
            classes,
            normalizer,
            extractor,
            classifier,
        );
        Ok(Some(Outcome { model, metrics }))
    }
}

/// Report any classifier failure as [`MlError::Classifier`].
fn classifier_error(e: MlError) -> MlError {
    match e {
        MlError::Classifier(_) => e,
        other => MlError::classifier(other.to_string()),
    }
}
