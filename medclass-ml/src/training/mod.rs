//! Training: the job state machine, classifier capability, metrics and artifacts.

pub mod artifacts;
pub mod classifier;
pub mod job;
pub mod metrics;
pub mod model;
pub mod policy;
pub mod status;

pub use artifacts::{ArtifactStore, FsArtifactStore, ModelArtifact, corpus_fingerprint};
pub use classifier::{ClassifierFactory, TrainableClassifier};
pub use job::{TrainingJob, TrainingSettings};
pub use metrics::{ClassReport, EvaluationMetrics, evaluate};
pub use model::{Prediction, TrainedModel};
pub use policy::LabelPolicy;
pub use status::{JobState, LogEntry, StatusBoard, Step, TrainingStatus};
