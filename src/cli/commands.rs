//! CLI command definitions

use clap::Args;

/// Run every registered pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Container CLI to execute with (docker, podman, ...)
    #[arg(long)]
    pub docker: Option<String>,

    /// Timeout for each container run, in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Don't save execution to history
    #[arg(long)]
    pub no_history: bool,
}

/// Show the composed containers without running them
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List registered pipelines
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show execution history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Pipeline name to filter by
    #[arg(short, long)]
    pub pipeline: Option<String>,

    /// Number of recent executions to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Show every pipeline of a specific run
    #[arg(long)]
    pub execution_id: Option<String>,
}
