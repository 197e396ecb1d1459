//! The shipped database-backed test pipeline

use crate::helpers::*;
use scabbard::core::config::{FeatureMatrix, PipelineConfig};
use scabbard::core::ExecutionStatus;
use scabbard::persistence::{create_summaries, InMemoryPersistence, PersistenceBackend};
use scabbard::pipelines;
use std::path::Path;

#[tokio::test]
async fn test_default_pipeline_composition() {
    let config = PipelineConfig::default();
    let registry = pipelines::registry(&config);
    assert_eq!(registry.names(), vec!["test"]);

    let (client, engine) = scripted_client(ScriptedEngine::with_results(vec![Ok(
        "test result: ok. 12 passed".to_string(),
    )]));
    let state = run_registry(&registry, client, pipelines::scopes(&config))
        .await
        .unwrap();
    assert_run_completed(&state);

    let executed = engine.executed();
    assert_eq!(executed.len(), 1);
    let container = &executed[0];

    let db = container.service_bindings().get("db").unwrap();
    assert_eq!(db.image(), "postgres:16.2");
    assert_eq!(db.env_variable("POSTGRES_DB"), Some("winvoice-adapter"));
    assert_eq!(db.env_variable("POSTGRES_PASSWORD"), Some("password"));
    assert_eq!(db.env_variable("POSTGRES_USER"), Some("user"));
    assert_eq!(
        db.init_script_dirs().collect::<Vec<_>>(),
        vec![(
            Path::new("src/schema/initializable"),
            "/docker-entrypoint-initdb.d"
        )]
    );
    assert!(db.readiness_check().is_some());

    assert_eq!(
        container.env_variable("DATABASE_URL"),
        Some("postgresql://user:password@db/winvoice-adapter")
    );
    assert_eq!(
        container.env_variable("RUSTFLAGS"),
        Some("-C target-feature=-crt-static")
    );
    let command = container.command().unwrap();
    assert_eq!(&command[1..], &["hack", "--feature-powerset", "test"]);
}

#[tokio::test]
async fn test_configured_pipeline() {
    let yaml = r#"
name: "adapter-tests"
database:
  image: "postgres:17"
  name: "adapter"
  user: "ci"
  password: "hunter2"
toolchain:
  rustflags: null
  matrix: none
  command: ["test", "--workspace"]
"#;
    let config = PipelineConfig::from_yaml(yaml).unwrap();
    let registry = pipelines::registry(&config);

    let (client, engine) = scripted_client(ScriptedEngine::new());
    let state = run_registry(&registry, client, pipelines::scopes(&config))
        .await
        .unwrap();
    assert_pipeline_status(&state, "adapter-tests", ExecutionStatus::Completed);

    let container = &engine.executed()[0];
    assert_eq!(config.toolchain.matrix, FeatureMatrix::None);
    assert_eq!(
        container.env_variable("DATABASE_URL"),
        Some("postgresql://ci:hunter2@db/adapter")
    );
    assert_eq!(container.env_variable("RUSTFLAGS"), None);
    assert_eq!(
        container.command(),
        Some(&["cargo", "test", "--workspace"].map(String::from)[..])
    );
    assert_eq!(
        container.service_bindings()["db"].env_variable("POSTGRES_USER"),
        Some("ci")
    );
}

#[tokio::test]
async fn test_failed_run_is_saved_to_history() {
    let config = PipelineConfig::default();
    let registry = pipelines::registry(&config);

    let (client, _) = scripted_client(ScriptedEngine::with_results(vec![Err(exit_failure(
        101,
        "test db::insert ... FAILED",
    ))]));
    let err = run_registry(&registry, client, pipelines::scopes(&config))
        .await
        .unwrap_err();

    let store = InMemoryPersistence::new();
    for summary in create_summaries(err.state()) {
        store.save_execution(&summary).await.unwrap();
    }

    let history = store.list_executions("test").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, ExecutionStatus::Failed);
    assert_eq!(
        history[0].error.as_deref(),
        Some("command exited with code 101: test db::insert ... FAILED")
    );
}
