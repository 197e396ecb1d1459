//! CLI output formatting

use crate::{
    core::{Container, ExecutionStatus, RunState},
    execution::ExecutionEvent,
    persistence::ExecutionSummary,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");

/// Create a spinner for a running pipeline
pub fn create_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
        ExecutionStatus::Skipped => style("SKIPPED").dim().to_string(),
    }
}

fn short_id(id: &uuid::Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

/// Format execution summary for display
pub fn format_execution_summary(summary: &ExecutionSummary) -> String {
    let status_icon = match summary.status {
        ExecutionStatus::Completed => CHECK,
        ExecutionStatus::Failed => CROSS,
        ExecutionStatus::Running => SPINNER,
        ExecutionStatus::Skipped => SKIP,
        ExecutionStatus::Pending => INFO,
    };

    let mut line = format!(
        "{} {} - {} - {} - {}",
        status_icon,
        style(short_id(&summary.execution_id)).dim(),
        style(&summary.pipeline_name).bold(),
        format_status(summary.status),
        style(summary.started_at.format("%Y-%m-%d %H:%M:%S")).dim()
    );
    if let Some(completed) = summary.completed_at {
        if let Ok(duration) = completed.signed_duration_since(summary.started_at).to_std() {
            line.push_str(&format!(" ({})", format_duration(duration)));
        }
    }
    if let Some(error) = &summary.error {
        line.push_str(&format!("\n      {}", style(error).red()));
    }
    line
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::RunStarted {
            execution_id,
            pipelines,
        } => format!(
            "{} Starting run {} ({} pipelines)",
            ROCKET,
            style(short_id(execution_id)).dim(),
            style(pipelines.len()).cyan()
        ),
        ExecutionEvent::PipelineStarted { name } => {
            format!("{} {}", SPINNER, style(name).cyan())
        }
        ExecutionEvent::PipelineCompleted { name, .. } => {
            format!("{} {}", CHECK, style(name).green())
        }
        ExecutionEvent::PipelineFailed { name, error } => format!(
            "{} {}: {}",
            CROSS,
            style(name).red(),
            style(format_output(error, 20)).dim()
        ),
        ExecutionEvent::PipelineSkipped { name } => {
            format!("{} {} skipped", SKIP, style(name).dim())
        }
        ExecutionEvent::RunCompleted {
            execution_id,
            status,
        } => {
            let status_str = match status {
                ExecutionStatus::Completed => format!("{} completed", style("successfully").green()),
                ExecutionStatus::Failed => style("failed").red().to_string(),
                ExecutionStatus::Skipped => style("skipped (not the entry point)").dim().to_string(),
                _ => format!("{:?}", status),
            };
            format!(
                "{} Run ({}) {}",
                INFO,
                style(short_id(execution_id)).dim(),
                status_str
            )
        }
    }
}

/// Final line of a failed run
pub fn format_run_failure(state: &RunState) -> String {
    format!(
        "{} {} ({}/{} pipelines passed, {})",
        CROSS,
        style("Run failed").red(),
        state.count(ExecutionStatus::Completed),
        state.total(),
        style(format!("{:.0}%", state.progress() * 100.0)).cyan()
    )
}

/// Format a composed container for `plan`
pub fn format_container(container: &Container) -> String {
    let mut lines = vec![format!("{} {}", style("image").bold(), container.image())];

    for (alias, service) in container.service_bindings() {
        lines.push(format!(
            "{} {} -> {}",
            style("service").bold(),
            style(alias).cyan(),
            service.image()
        ));
        for (name, value) in service.env_variables() {
            lines.push(format!("    {}={}", name, value));
        }
        for (host_dir, path) in service.init_script_dirs() {
            lines.push(format!("    {}:{} (ro)", host_dir.display(), path));
        }
    }
    for (path, host_dir) in container.directories() {
        lines.push(format!("{} {}:{}", style("mount").bold(), host_dir.display(), path));
    }
    for (path, cache) in container.caches() {
        lines.push(format!("{} {}:{}", style("cache").bold(), cache, path));
    }
    if let Some(workdir) = container.workdir() {
        lines.push(format!("{} {}", style("workdir").bold(), workdir));
    }
    for (name, value) in container.env_variables() {
        lines.push(format!("{} {}={}", style("env").bold(), name, value));
    }
    for exec in container.execs() {
        lines.push(format!("{} {}", style("exec").bold(), shell_words::join(exec)));
    }

    lines.join("\n")
}

/// Format a duration as `1h 2m 3s`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Keep the last `max_lines` lines of a long output
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let truncated = lines[lines.len() - max_lines..].join("\n");
        format!(
            "{}... ({} earlier lines)\n{}",
            style("[truncated]").dim(),
            lines.len() - max_lines,
            truncated
        )
    }
}
