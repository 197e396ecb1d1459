//! Test utility functions for scabbard

use async_trait::async_trait;
use scabbard::core::{Container, ExecutionStatus, RunState};
use scabbard::engine::{Client, Engine, EngineError};
use scabbard::execution::{EntryPoint, PipelineRegistry, PipelineRunner, RunError};
use scabbard::scope::ScopeRegistry;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Engine that records containers and replays scripted results
///
/// Each execution takes the next scripted result; once the script runs out
/// every execution succeeds with empty stdout.
#[derive(Default)]
pub struct ScriptedEngine {
    results: Mutex<VecDeque<Result<String, EngineError>>>,
    executed: Mutex<Vec<Container>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(results: Vec<Result<String, EngineError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn executed(&self) -> Vec<Container> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    async fn stdout(&self, container: &Container) -> Result<String, EngineError> {
        self.executed.lock().unwrap().push(container.clone());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// A client over `engine`, keeping a handle on the engine for assertions
pub fn scripted_client(engine: ScriptedEngine) -> (Client, Arc<ScriptedEngine>) {
    let engine = Arc::new(engine);
    (Client::from_shared(engine.clone()), engine)
}

/// Run `registry` as the entry point
pub async fn run_registry(
    registry: &PipelineRegistry,
    client: Client,
    scopes: ScopeRegistry,
) -> Result<RunState, RunError> {
    PipelineRunner::new(client, scopes)
        .execute(registry, EntryPoint::Main)
        .await
}

/// An execution failure as the engine reports a failing command
pub fn exit_failure(exit_code: i32, stderr: &str) -> EngineError {
    EngineError::Execution {
        exit_code,
        stderr: stderr.to_string(),
    }
}

/// Assert the status of one pipeline of a run
pub fn assert_pipeline_status(state: &RunState, name: &str, expected: ExecutionStatus) {
    let outcome = state
        .outcome(name)
        .unwrap_or_else(|| panic!("pipeline '{}' not in run", name));
    assert_eq!(
        outcome.status, expected,
        "pipeline '{}' should be {:?}, was {:?} (error: {:?})",
        name, expected, outcome.status, outcome.error
    );
}

/// Assert the run completed and every pipeline with it
pub fn assert_run_completed(state: &RunState) {
    assert_eq!(state.status, ExecutionStatus::Completed);
    assert_eq!(state.count(ExecutionStatus::Completed), state.total());
    assert!(state.completed_at.is_some());
}
