//! Training status record and its single-writer board.

use crate::error::MlError;
use crate::training::metrics::EvaluationMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

pub const IDLE_STEP: &str = "idle";
pub const STOPPED_STEP: &str = "stopped";
pub const FAILED_STEP: &str = "failed";
pub const COMPLETED_STEP: &str = "completed";

/// Lifecycle state of the training job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }
}

/// Pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Load,
    Normalize,
    ExtractFeatures,
    Fit,
    Evaluate,
    Persist,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::Load,
        Step::Normalize,
        Step::ExtractFeatures,
        Step::Fit,
        Step::Evaluate,
        Step::Persist,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Normalize => "normalize",
            Self::ExtractFeatures => "extract_features",
            Self::Fit => "fit",
            Self::Evaluate => "evaluate",
            Self::Persist => "persist",
        }
    }

    /// Progress reported when the step starts.
    pub fn progress(self) -> u8 {
        match self {
            Self::Load => 10,
            Self::Normalize => 25,
            Self::ExtractFeatures => 40,
            Self::Fit => 70,
            Self::Evaluate => 90,
            Self::Persist => 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub step: String,
    pub progress: u8,
}

/// Snapshot of the training job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingStatus {
    pub run_id: Option<Uuid>,
    pub state: JobState,
    pub is_running: bool,
    pub progress: u8,
    pub current_step: String,
    pub logs: Vec<LogEntry>,
    pub error: Option<String>,
    pub metrics: Option<EvaluationMetrics>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TrainingStatus {
    pub fn idle() -> Self {
        Self {
            run_id: None,
            state: JobState::Idle,
            is_running: false,
            progress: 0,
            current_step: IDLE_STEP.to_string(),
            logs: Vec::new(),
            error: None,
            metrics: None,
            started_at: None,
            finished_at: None,
        }
    }

    fn running(run_id: Uuid) -> Self {
        Self {
            run_id: Some(run_id),
            state: JobState::Running,
            is_running: true,
            current_step: "starting".to_string(),
            started_at: Some(Utc::now()),
            ..Self::idle()
        }
    }

    fn log(&mut self, step: &str, progress: u8) {
        self.current_step = step.to_string();
        self.progress = progress;
        self.logs.push(LogEntry {
            timestamp: Utc::now(),
            step: step.to_string(),
            progress,
        });
    }

    fn finish(&mut self, state: JobState) {
        self.state = state;
        self.is_running = false;
        self.finished_at = Some(Utc::now());
    }
}

impl Default for TrainingStatus {
    fn default() -> Self {
        Self::idle()
    }
}

/// Owner of the status record.
///
/// Every mutation clones the current record, edits the copy and swaps it in
/// whole, so readers holding a snapshot never observe a partial update.
/// Updates for a run are dropped once that run is no longer the running one.
#[derive(Debug)]
pub struct StatusBoard {
    tx: watch::Sender<Arc<TrainingStatus>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(TrainingStatus::idle()));
        Self { tx }
    }

    pub fn snapshot(&self) -> Arc<TrainingStatus> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<TrainingStatus>> {
        self.tx.subscribe()
    }

    /// Reset the record for `run_id` unless a run is already in flight.
    pub fn begin(&self, run_id: Uuid) -> Result<(), MlError> {
        let mut result = Ok(());
        self.tx.send_if_modified(|current| {
            if current.is_running {
                result = Err(MlError::JobAlreadyRunning {
                    run_id: current.run_id.unwrap_or_default(),
                });
                return false;
            }
            *current = Arc::new(TrainingStatus::running(run_id));
            true
        });
        result
    }

    /// Record entry into `step`. Returns `false` if the run is no longer current.
    pub fn enter_step(&self, run_id: Uuid, step: Step) -> bool {
        self.update_running(run_id, |s| s.log(step.name(), step.progress()))
    }

    /// Mark the run failed, rolling progress back to `progress`.
    pub fn fail(&self, run_id: Uuid, error: String, progress: u8) -> bool {
        self.update_running(run_id, |s| {
            s.log(FAILED_STEP, progress);
            s.error = Some(error);
            s.finish(JobState::Failed);
        })
    }

    pub fn complete(&self, run_id: Uuid, metrics: EvaluationMetrics) -> bool {
        self.update_running(run_id, |s| {
            s.log(COMPLETED_STEP, 100);
            s.metrics = Some(metrics);
            s.finish(JobState::Completed);
        })
    }

    /// Mark the in-flight run stopped and return its id.
    pub fn stop(&self) -> Result<Uuid, MlError> {
        let mut result = Err(MlError::JobNotRunning);
        self.tx.send_if_modified(|current| {
            let Some(run_id) = current.run_id.filter(|_| current.is_running) else {
                return false;
            };
            let mut next = TrainingStatus::clone(current);
            let progress = next.progress;
            next.log(STOPPED_STEP, progress);
            next.finish(JobState::Stopped);
            *current = Arc::new(next);
            result = Ok(run_id);
            true
        });
        result
    }

    fn update_running(&self, run_id: Uuid, edit: impl FnOnce(&mut TrainingStatus)) -> bool {
        self.tx.send_if_modified(|current| {
            if !current.is_running || current.run_id != Some(run_id) {
                return false;
            }
            let mut next = TrainingStatus::clone(current);
            edit(&mut next);
            *current = Arc::new(next);
            true
        })
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}
