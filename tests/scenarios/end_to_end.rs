//! A toolchain bound to a database service, run to completion

use crate::helpers::*;
use scabbard::core::{Container, ExecutionStatus};
use scabbard::engine::EngineError;
use scabbard::execution::{PipelineError, PipelineRegistry, RunError};
use scabbard::scope::db::DbServiceOptions;
use scabbard::scope::{ScopeRegistry, ScopeToken};
use std::path::Path;

const TOOLCHAIN: ScopeToken<Container> = ScopeToken::new("toolchain");

fn registry() -> PipelineRegistry {
    let mut registry = PipelineRegistry::new();
    registry.register("e2e", |client, injector| async move {
        let service = client.db_service(
            "X",
            DbServiceOptions::new()
                .with_env("A", "db")
                .with_env("B", "u")
                .with_env("C", "p")
                .with_init_scripts("D", "/init"),
        );

        let container = injector
            .inject(&TOOLCHAIN)
            .await?
            .with_service_binding("db", &service)
            .with_env_variable("URL", "proto://u:p@db/db")
            .with_exec(["test"]);

        Ok(client.stdout(&container).await?)
    });
    registry
}

fn scopes() -> ScopeRegistry {
    ScopeRegistry::new().provide_value(TOOLCHAIN, Container::from_image("T"))
}

#[tokio::test]
async fn test_service_bound_and_output_returned() {
    let (client, engine) = scripted_client(ScriptedEngine::with_results(vec![Ok(
        "all tests passed\n".to_string(),
    )]));

    let state = run_registry(&registry(), client, scopes()).await.unwrap();
    assert_run_completed(&state);
    assert_eq!(
        state.outcome("e2e").and_then(|o| o.output.as_deref()),
        Some("all tests passed\n")
    );

    let executed = engine.executed();
    assert_eq!(executed.len(), 1);
    let container = &executed[0];

    // (a) service reachable as `db`
    let service = container.service_bindings().get("db").unwrap();
    assert_eq!(service.image(), "X");
    assert_eq!(service.env_variable("A"), Some("db"));
    assert_eq!(service.env_variable("B"), Some("u"));
    assert_eq!(service.env_variable("C"), Some("p"));
    assert_eq!(
        service.init_script_dirs().collect::<Vec<_>>(),
        vec![(Path::new("D"), "/init")]
    );
    // unknown image, so no readiness probe
    assert!(service.readiness_check().is_none());

    // (b) literal connection string
    assert_eq!(container.env_variable("URL"), Some("proto://u:p@db/db"));

    // (c) the command
    assert_eq!(container.image(), "T");
    assert_eq!(container.command(), Some(&["test".to_string()][..]));
}

#[tokio::test]
async fn test_non_zero_exit_fails_without_output() {
    let (client, _) = scripted_client(ScriptedEngine::with_results(vec![Err(exit_failure(
        1,
        "1 test failed",
    ))]));

    let err = run_registry(&registry(), client, scopes()).await.unwrap_err();
    let RunError::PipelineFailed { source, .. } = &err;
    assert!(matches!(
        source,
        PipelineError::Engine(EngineError::Execution { exit_code: 1, .. })
    ));

    let outcome = err.state().outcome("e2e").unwrap();
    assert_eq!(outcome.status, ExecutionStatus::Failed);
    assert!(outcome.output.is_none());
    assert_eq!(
        outcome.error.as_deref(),
        Some("command exited with code 1: 1 test failed")
    );
}

#[tokio::test]
async fn test_service_that_never_starts() {
    let (client, _) = scripted_client(ScriptedEngine::with_results(vec![Err(
        EngineError::Provisioning {
            alias: "db".to_string(),
            message: "image X not found".to_string(),
        },
    )]));

    let err = run_registry(&registry(), client, scopes()).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "pipeline 'e2e' failed: service 'db' failed to start: image X not found"
    );
}

#[tokio::test]
async fn test_invalid_env_rejected_before_engine() {
    let mut registry = PipelineRegistry::new();
    registry.register("bad-env", |client, injector| async move {
        let container = injector
            .inject(&TOOLCHAIN)
            .await?
            .with_env_variable("NOT VALID", "x")
            .with_exec(["test"]);
        Ok(client.stdout(&container).await?)
    });

    let (client, engine) = scripted_client(ScriptedEngine::new());
    let err = run_registry(&registry, client, scopes()).await.unwrap_err();

    let RunError::PipelineFailed { source, .. } = &err;
    assert!(matches!(
        source,
        PipelineError::Engine(EngineError::Composition(_))
    ));
    assert!(engine.executed().is_empty());
}
