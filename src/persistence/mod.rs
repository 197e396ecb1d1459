//! Persistence layer for run history

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteExecutionStore;

pub use crate::core::ExecutionStatus;
use crate::core::RunState;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Outcome of one pipeline within one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    /// Run the pipeline belonged to
    pub execution_id: Uuid,

    /// Pipeline name
    pub pipeline_name: String,

    /// Execution status
    pub status: ExecutionStatus,

    /// When the pipeline started (run start for skipped pipelines)
    pub started_at: DateTime<Utc>,

    /// When the pipeline finished
    pub completed_at: Option<DateTime<Utc>>,

    /// Error message for failed pipelines
    pub error: Option<String>,
}

/// Trait for persistence backends
#[async_trait::async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Save a pipeline outcome, replacing an earlier one of the same run
    async fn save_execution(&self, execution: &ExecutionSummary) -> Result<()>;

    /// Every pipeline outcome of a run
    async fn load_run(&self, execution_id: Uuid) -> Result<Vec<ExecutionSummary>>;

    /// Outcomes of a pipeline, newest first
    async fn list_executions(&self, pipeline_name: &str) -> Result<Vec<ExecutionSummary>>;

    /// Newest outcomes across all pipelines
    async fn list_recent(&self, limit: usize) -> Result<Vec<ExecutionSummary>>;

    /// All pipeline names, sorted
    async fn list_pipelines(&self) -> Result<Vec<String>>;
}

/// In-memory persistence (for testing or `--no-history` runs)
#[derive(Default)]
pub struct InMemoryPersistence {
    executions: RwLock<HashMap<(Uuid, String), ExecutionSummary>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    async fn select<F>(&self, filter: F) -> Vec<ExecutionSummary>
    where
        F: Fn(&ExecutionSummary) -> bool,
    {
        let execs = self.executions.read().await;
        let mut result: Vec<_> = execs.values().filter(|e| filter(e)).cloned().collect();
        result.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        result
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for InMemoryPersistence {
    async fn save_execution(&self, execution: &ExecutionSummary) -> Result<()> {
        let mut execs = self.executions.write().await;
        execs.insert(
            (execution.execution_id, execution.pipeline_name.clone()),
            execution.clone(),
        );
        Ok(())
    }

    async fn load_run(&self, execution_id: Uuid) -> Result<Vec<ExecutionSummary>> {
        Ok(self.select(|e| e.execution_id == execution_id).await)
    }

    async fn list_executions(&self, pipeline_name: &str) -> Result<Vec<ExecutionSummary>> {
        Ok(self.select(|e| e.pipeline_name == pipeline_name).await)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ExecutionSummary>> {
        let mut result = self.select(|_| true).await;
        result.truncate(limit);
        Ok(result)
    }

    async fn list_pipelines(&self) -> Result<Vec<String>> {
        let execs = self.executions.read().await;
        let mut names: Vec<String> = execs.keys().map(|(_, name)| name.clone()).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

/// One summary per pipeline of a run
pub fn create_summaries(state: &RunState) -> Vec<ExecutionSummary> {
    let run_started = state.started_at.unwrap_or_else(Utc::now);
    state
        .pipelines
        .iter()
        .map(|outcome| ExecutionSummary {
            execution_id: state.execution_id,
            pipeline_name: outcome.name.clone(),
            status: outcome.status,
            started_at: outcome.started_at.unwrap_or(run_started),
            completed_at: outcome.completed_at,
            error: outcome.error.clone(),
        })
        .collect()
}
