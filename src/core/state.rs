//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a run or of a single pipeline within it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Not started yet
    Pending,
    /// Currently running
    Running,
    /// Finished successfully
    Completed,
    /// Failed
    Failed,
    /// Not run (library entry point, or an earlier pipeline failed)
    Skipped,
}

impl ExecutionStatus {
    /// Check if the status is final
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Skipped
        )
    }
}

/// Outcome of a single registered pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    /// Name the pipeline was registered under
    pub name: String,

    pub status: ExecutionStatus,

    pub started_at: Option<DateTime<Utc>>,

    pub completed_at: Option<DateTime<Utc>>,

    /// Captured stdout (completed pipelines only)
    pub output: Option<String>,

    /// Error message (failed pipelines only)
    pub error: Option<String>,
}

impl PipelineOutcome {
    /// Create a pending outcome
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ExecutionStatus::Pending,
            started_at: None,
            completed_at: None,
            output: None,
            error: None,
        }
    }

    pub fn start(&mut self) {
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn complete(&mut self, output: String) {
        self.status = ExecutionStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.output = Some(output);
    }

    pub fn fail(&mut self, error: String) {
        self.status = ExecutionStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error = Some(error);
    }

    pub fn skip(&mut self) {
        self.status = ExecutionStatus::Skipped;
    }
}

/// Overall state of one registry run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// Current execution status
    pub status: ExecutionStatus,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When execution completed/failed
    pub completed_at: Option<DateTime<Utc>>,

    /// One entry per registered pipeline, in registration order
    pub pipelines: Vec<PipelineOutcome>,
}

impl RunState {
    /// Create a new run state with every pipeline pending
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            execution_id: Uuid::new_v4(),
            status: ExecutionStatus::Pending,
            started_at: None,
            completed_at: None,
            pipelines: names.into_iter().map(PipelineOutcome::pending).collect(),
        }
    }

    /// Mark run as started
    pub fn start(&mut self) {
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Mark run as completed
    pub fn complete(&mut self) {
        self.status = ExecutionStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark run as failed
    pub fn fail(&mut self) {
        self.status = ExecutionStatus::Failed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark run and every pipeline as skipped
    pub fn skip(&mut self) {
        self.status = ExecutionStatus::Skipped;
        for outcome in &mut self.pipelines {
            outcome.skip();
        }
    }

    pub fn total(&self) -> usize {
        self.pipelines.len()
    }

    pub fn count(&self, status: ExecutionStatus) -> usize {
        self.pipelines.iter().filter(|p| p.status == status).count()
    }

    /// Fraction of pipelines that completed successfully (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.pipelines.is_empty() {
            return 0.0;
        }
        self.count(ExecutionStatus::Completed) as f64 / self.pipelines.len() as f64
    }

    pub fn outcome(&self, name: &str) -> Option<&PipelineOutcome> {
        self.pipelines.iter().find(|p| p.name == name)
    }
}
