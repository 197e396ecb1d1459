//! Container composition: immutability, bindings, env overrides, determinism

use crate::helpers::*;
use scabbard::core::config::PipelineConfig;
use scabbard::core::{Container, Service};
use scabbard::pipelines;

fn base() -> Container {
    Container::from_image("rust:1-alpine").with_env_variable("CARGO_TERM_COLOR", "never")
}

#[test]
fn test_threading_matches_chaining() {
    let service = Service::new("postgres:16.2").with_env_variable("POSTGRES_USER", "u");

    let chained = base()
        .with_service_binding("db", &service)
        .with_env_variable("DATABASE_URL", "postgresql://u:p@db/app")
        .with_exec(["cargo", "test"]);

    let step1 = base();
    let step2 = step1.with_service_binding("db", &service);
    let step3 = step2.with_env_variable("DATABASE_URL", "postgresql://u:p@db/app");
    let step4 = step3.with_exec(["cargo", "test"]);

    assert_eq!(chained, step4);

    // Earlier descriptors are untouched
    assert_eq!(step1, base());
    assert!(step1.service_bindings().is_empty());
    assert!(step2.env_variable("DATABASE_URL").is_none());
    assert!(step3.execs().is_empty());
}

#[test]
fn test_second_binding_keeps_first() {
    let postgres = Service::new("postgres:16.2");
    let redis = Service::new("redis:7");

    let one = base().with_service_binding("db", &postgres);
    let two = one.with_service_binding("cache", &redis);

    assert_eq!(one.service_bindings().len(), 1);
    assert_eq!(one.service_bindings().get("db"), Some(&postgres));

    assert_eq!(two.service_bindings().len(), 2);
    assert_eq!(two.service_bindings().get("db"), Some(&postgres));
    assert_eq!(two.service_bindings().get("cache"), Some(&redis));
}

#[test]
fn test_env_last_write_wins_without_touching_sibling() {
    let shared = base().with_env_variable("K", "V1");
    let sibling = shared.with_env_variable("OTHER", "x");
    let overridden = shared.with_env_variable("K", "V2");

    assert_eq!(overridden.env_variable("K"), Some("V2"));
    assert_eq!(shared.env_variable("K"), Some("V1"));
    assert_eq!(sibling.env_variable("K"), Some("V1"));
    assert_eq!(sibling.env_variable("OTHER"), Some("x"));
    assert_eq!(overridden.env_variable("OTHER"), None);
}

#[test]
fn test_descriptors_shared_across_threads() {
    let shared = base().with_exec(["cargo", "build"]);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let base = shared.clone();
            std::thread::spawn(move || base.with_env_variable("SHARD", i.to_string()))
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let branch = handle.join().unwrap();
        assert_eq!(branch.env_variable("SHARD"), Some(i.to_string().as_str()));
    }
    assert_eq!(shared.env_variable("SHARD"), None);
}

#[tokio::test]
async fn test_runs_request_equivalent_services() {
    let config = PipelineConfig::default();
    let registry = pipelines::registry(&config);

    let mut composed = Vec::new();
    for _ in 0..2 {
        let (client, engine) = scripted_client(ScriptedEngine::new());
        let state = run_registry(&registry, client, pipelines::scopes(&config))
            .await
            .unwrap();
        assert_run_completed(&state);
        composed.extend(engine.executed());
    }

    assert_eq!(composed.len(), 2);
    assert_eq!(composed[0], composed[1]);
    assert_eq!(
        composed[0].service_bindings(),
        composed[1].service_bindings()
    );
    assert_eq!(
        serde_json::to_string(&composed[0]).unwrap(),
        serde_json::to_string(&composed[1]).unwrap()
    );
}
