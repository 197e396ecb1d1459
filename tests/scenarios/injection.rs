//! Scope injection from inside pipelines

use crate::helpers::*;
use scabbard::core::config::ToolchainConfig;
use scabbard::core::{Container, ExecutionStatus};
use scabbard::execution::{PipelineError, PipelineRegistry, RunError};
use scabbard::scope::rust::{self, WITH_CARGO_HACK};
use scabbard::scope::{InjectError, ScopeRegistry, ScopeToken};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const TOOLCHAIN: ScopeToken<Container> = ScopeToken::new("toolchain");

fn inject_and_run(registry: &mut PipelineRegistry, name: &str) {
    registry.register(name, |client, injector| async move {
        let container = injector.inject(&WITH_CARGO_HACK).await?;
        Ok(client.stdout(&container.with_exec(["cargo", "test"])).await?)
    });
}

#[tokio::test]
async fn test_unregistered_scope_fails_the_pipeline() {
    let mut registry = PipelineRegistry::new();
    inject_and_run(&mut registry, "test");

    let (client, engine) = scripted_client(ScriptedEngine::new());
    let err = run_registry(&registry, client, ScopeRegistry::new())
        .await
        .unwrap_err();

    let RunError::PipelineFailed { name, source, .. } = &err;
    assert_eq!(name, "test");
    assert!(matches!(
        source,
        PipelineError::Inject(InjectError::NotFound(token)) if token == "rust/cargo-hack"
    ));

    // Nothing was executed with a stand-in container
    assert!(engine.executed().is_empty());
    assert_pipeline_status(err.state(), "test", ExecutionStatus::Failed);
}

#[tokio::test]
async fn test_scope_built_once_per_run() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let scopes = ScopeRegistry::new().provide(TOOLCHAIN, move |_, client| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move { Ok(client.container("rust:1-alpine")) }
    });

    let mut registry = PipelineRegistry::new();
    for name in ["check", "test"] {
        registry.register(name, move |client, injector| async move {
            let toolchain = injector.inject(&TOOLCHAIN).await?;
            Ok(client.stdout(&toolchain.with_exec(["cargo", name])).await?)
        });
    }

    let (client, engine) = scripted_client(ScriptedEngine::new());
    let state = run_registry(&registry, client, scopes).await.unwrap();

    assert_run_completed(&state);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let commands: Vec<_> = engine
        .executed()
        .iter()
        .map(|c| c.command().map(<[String]>::to_vec))
        .collect();
    assert_eq!(
        commands,
        vec![
            Some(vec!["cargo".to_string(), "check".to_string()]),
            Some(vec!["cargo".to_string(), "test".to_string()]),
        ]
    );
}

#[tokio::test]
async fn test_cargo_hack_scope_in_pipeline() {
    let mut registry = PipelineRegistry::new();
    inject_and_run(&mut registry, "test");
    let scopes = rust::provide(ScopeRegistry::new(), &ToolchainConfig::default());

    let (client, engine) = scripted_client(ScriptedEngine::with_results(vec![Ok(
        "test result: ok".to_string(),
    )]));
    let state = run_registry(&registry, client, scopes).await.unwrap();

    assert_run_completed(&state);
    let executed = engine.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].image(), "rust:1-alpine");
    // apk add, cargo install cargo-hack, cargo test
    assert_eq!(executed[0].execs().len(), 3);
    assert_eq!(
        state.outcome("test").and_then(|o| o.output.as_deref()),
        Some("test result: ok")
    );
}

#[tokio::test]
async fn test_scope_factory_failure_is_reported() {
    let scopes = ScopeRegistry::new().provide(WITH_CARGO_HACK, |_, _| async {
        Err::<Container, _>(InjectError::resolution(
            "rust/cargo-hack",
            "cargo-hack is not available for this toolchain",
        ))
    });
    let mut registry = PipelineRegistry::new();
    inject_and_run(&mut registry, "test");

    let (client, _) = scripted_client(ScriptedEngine::new());
    let err = run_registry(&registry, client, scopes).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "pipeline 'test' failed: failed to resolve scope 'rust/cargo-hack': \
         cargo-hack is not available for this toolchain"
    );
}
