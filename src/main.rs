use anyhow::{Context, Result};
use scabbard::cli::commands::{HistoryCommand, ListCommand, PlanCommand, RunCommand};
use scabbard::cli::output::*;
use scabbard::cli::{Cli, Command};
use scabbard::core::config::PipelineConfig;
use scabbard::engine::{Client, DockerEngine, EngineConfig, RecordingEngine};
use scabbard::execution::{EntryPoint, ExecutionEvent, PipelineRunner};
use scabbard::persistence::{create_summaries, PersistenceBackend};
use scabbard::pipelines;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let config = load_config(cli.config.as_deref())?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_pipelines(cmd, &config).await?,
        Command::Plan(cmd) => plan_pipelines(cmd, &config).await?,
        Command::List(cmd) => list_pipelines(cmd, &config).await?,
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load pipeline config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

#[cfg(feature = "sqlite")]
async fn history_store() -> Result<Arc<dyn PersistenceBackend>> {
    let store = scabbard::persistence::SqliteExecutionStore::with_default_path().await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "sqlite"))]
async fn history_store() -> Result<Arc<dyn PersistenceBackend>> {
    tracing::warn!("Built without the sqlite feature; history is not kept between runs");
    Ok(Arc::new(scabbard::persistence::InMemoryPersistence::new()))
}

async fn run_pipelines(cmd: &RunCommand, config: &PipelineConfig) -> Result<()> {
    let mut engine_config = EngineConfig::default();
    if let Some(binary) = &cmd.docker {
        engine_config = engine_config.with_binary(binary);
    }
    if let Some(timeout) = cmd.timeout {
        engine_config = engine_config.with_timeout(timeout);
    }

    // Set up persistence
    let store = if cmd.no_history {
        None
    } else {
        Some(history_store().await?)
    };

    let registry = pipelines::registry(config);
    let engine = DockerEngine::new(engine_config);
    debug!(
        "Executing with {} (timeout {}s)",
        engine.config().binary,
        engine.config().timeout_secs
    );
    let client = Client::new(engine);
    let mut runner = PipelineRunner::new(client, pipelines::scopes(config));

    // Set up event handler for console output
    let spinner = create_spinner();
    let progress = spinner.clone();
    runner.add_event_handler(move |event| match event {
        ExecutionEvent::PipelineStarted { name } => {
            progress.println(format_execution_event(event));
            progress.set_message(format!("Running {}", name));
        }
        _ => progress.println(format_execution_event(event)),
    });

    // The binary is the entry point: this is where pipelines actually run
    let result = runner.execute(&registry, EntryPoint::Main).await;
    spinner.finish_and_clear();

    let state = match &result {
        Ok(state) => state,
        Err(e) => e.state(),
    };

    // Save to history
    if let Some(store) = &store {
        for summary in create_summaries(state) {
            store.save_execution(&summary).await?;
        }
        println!(
            "\n{} Execution saved to history (ID: {})",
            INFO,
            style(&state.execution_id.simple().to_string()[..8]).dim()
        );
    }

    // Print final status
    match result {
        Ok(_) => {
            println!(
                "\n{} {} pipelines completed {}",
                CHECK,
                style(registry.len()).bold(),
                style("successfully").green()
            );
            Ok(())
        }
        Err(e) => {
            println!("\n{}", format_run_failure(e.state()));
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

async fn plan_pipelines(cmd: &PlanCommand, config: &PipelineConfig) -> Result<()> {
    let engine = Arc::new(RecordingEngine::new());
    let client = Client::from_shared(engine.clone());
    let registry = pipelines::registry(config);
    let runner = PipelineRunner::new(client, pipelines::scopes(config));

    runner
        .execute(&registry, EntryPoint::Main)
        .await
        .context("Failed to compose pipelines")?;

    let containers = engine.executed();
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&containers)?);
        return Ok(());
    }

    for (name, container) in registry.names().iter().zip(&containers) {
        println!("{} {}", ROCKET, style(name).bold());
        for line in format_container(container).lines() {
            println!("  {}", line);
        }
        println!();
    }

    Ok(())
}

async fn list_pipelines(cmd: &ListCommand, config: &PipelineConfig) -> Result<()> {
    let registry = pipelines::registry(config);

    if cmd.json {
        let data = serde_json::json!({ "pipelines": registry.names() });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if registry.is_empty() {
        println!("{} No pipelines registered", INFO);
        return Ok(());
    }

    println!("{} Registered pipelines:", INFO);
    let store = history_store().await?;
    for name in registry.names() {
        let executions = store.list_executions(name).await?;
        match executions.first() {
            Some(last) => println!(
                "  {} (last run: {}, {} runs)",
                style(name).bold(),
                format_status(last.status),
                style(executions.len()).cyan()
            ),
            None => println!("  {} (never run)", style(name).bold()),
        }
    }

    let registered = registry.names();
    let retired: Vec<String> = store
        .list_pipelines()
        .await?
        .into_iter()
        .filter(|name| !registered.contains(&name.as_str()))
        .collect();
    if !retired.is_empty() {
        println!("{} Only in history: {}", INFO, style(retired.join(", ")).dim());
    }

    Ok(())
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = history_store().await?;

    let executions = if let Some(exec_id_str) = &cmd.execution_id {
        let exec_id = uuid::Uuid::parse_str(exec_id_str).context("Invalid execution ID format")?;
        store.load_run(exec_id).await?
    } else if let Some(pipeline_name) = &cmd.pipeline {
        let mut executions = store.list_executions(pipeline_name).await?;
        executions.truncate(cmd.limit);
        executions
    } else {
        store.list_recent(cmd.limit).await?
    };

    if cmd.json {
        let data = serde_json::json!({ "executions": executions });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if executions.is_empty() {
        println!("{} No executions found", WARN);
        return Ok(());
    }

    println!("{} Execution history (showing latest {}):", INFO, executions.len());
    for summary in &executions {
        println!("  {}", format_execution_summary(summary));
    }

    Ok(())
}
