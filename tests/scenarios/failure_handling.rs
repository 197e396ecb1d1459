//! Run ordering, fail-fast and the entry-point trigger

use crate::helpers::*;
use scabbard::core::ExecutionStatus;
use scabbard::engine::Client;
use scabbard::execution::{EntryPoint, PipelineRegistry, PipelineRunner};
use scabbard::scope::ScopeRegistry;
use std::sync::{Arc, Mutex};

/// Registry whose pipelines each run `echo <name>` and log their name
fn echo_registry(names: &[&'static str], log: Arc<Mutex<Vec<&'static str>>>) -> PipelineRegistry {
    let mut registry = PipelineRegistry::new();
    for &name in names {
        let log = log.clone();
        registry.register(name, move |client: Client, _| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(name);
                let container = client.container("alpine:3").with_exec(["echo", name]);
                Ok(client.stdout(&container).await?)
            }
        });
    }
    registry
}

#[tokio::test]
async fn test_pipelines_run_in_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = echo_registry(&["fmt", "clippy", "test"], log.clone());

    let (client, engine) = scripted_client(ScriptedEngine::new());
    let state = run_registry(&registry, client, ScopeRegistry::new())
        .await
        .unwrap();

    assert_run_completed(&state);
    assert_eq!(*log.lock().unwrap(), vec!["fmt", "clippy", "test"]);
    assert_eq!(engine.executed().len(), 3);
    assert_eq!(state.progress(), 1.0);
}

#[tokio::test]
async fn test_first_failure_stops_the_run() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = echo_registry(&["fmt", "clippy", "test"], log.clone());

    let (client, engine) = scripted_client(ScriptedEngine::with_results(vec![
        Ok("fmt ok".to_string()),
        Err(exit_failure(101, "warning treated as error")),
    ]));
    let err = run_registry(&registry, client, ScopeRegistry::new())
        .await
        .unwrap_err();

    assert_eq!(*log.lock().unwrap(), vec!["fmt", "clippy"]);
    assert_eq!(engine.executed().len(), 2);

    let state = err.state();
    assert_eq!(state.status, ExecutionStatus::Failed);
    assert_pipeline_status(state, "fmt", ExecutionStatus::Completed);
    assert_pipeline_status(state, "clippy", ExecutionStatus::Failed);
    assert_pipeline_status(state, "test", ExecutionStatus::Skipped);
    assert!(state.outcome("test").unwrap().started_at.is_none());
}

#[tokio::test]
async fn test_library_entry_point_runs_nothing() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = echo_registry(&["fmt", "test"], log.clone());

    let (client, engine) = scripted_client(ScriptedEngine::new());
    let state = PipelineRunner::new(client, ScopeRegistry::new())
        .execute(&registry, EntryPoint::from(false))
        .await
        .unwrap();

    assert_eq!(state.status, ExecutionStatus::Skipped);
    assert_eq!(state.count(ExecutionStatus::Skipped), 2);
    assert!(log.lock().unwrap().is_empty());
    assert!(engine.executed().is_empty());
}

#[tokio::test]
async fn test_empty_registry_completes() {
    let (client, _) = scripted_client(ScriptedEngine::new());
    let state = run_registry(&PipelineRegistry::new(), client, ScopeRegistry::new())
        .await
        .unwrap();

    assert_eq!(state.status, ExecutionStatus::Completed);
    assert_eq!(state.total(), 0);
}
