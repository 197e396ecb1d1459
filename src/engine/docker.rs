//! Container CLI engine - runs descriptors through `docker` (or a compatible CLI)
//!
//! One execution is:
//! 1. create a private network,
//! 2. start every bound service detached on it, under its alias,
//! 3. poll each service's readiness probe,
//! 4. run the container on the same network and capture stdout,
//! 5. remove the services and the network, whatever happened before.

use crate::core::{Container, Service};
use crate::engine::{Engine, EngineConfig, EngineError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lines of service logs attached to a provisioning failure
const SERVICE_LOG_LINES: usize = 20;

/// Engine that shells out to a docker-compatible CLI
#[derive(Debug, Clone)]
pub struct DockerEngine {
    config: EngineConfig,
}

impl DockerEngine {
    /// Create a new engine
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the CLI to completion and capture its output
    async fn cli(&self, args: &[String]) -> Result<Output, EngineError> {
        debug!("{} {}", self.config.binary, shell_words::join(args));
        Command::new(&self.config.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                EngineError::Internal(format!("Failed to execute {}: {}", self.config.binary, e))
            })
    }

    async fn start_service(
        &self,
        network: &str,
        alias: &str,
        service: &Service,
        name: &str,
    ) -> Result<(), EngineError> {
        let mut mounts = Vec::new();
        for (host_dir, path) in service.init_script_dirs() {
            mounts.push((resolve_host_path(host_dir).await?, path.to_string()));
        }

        info!("Starting service {} ({}) as {}", alias, service.image(), name);
        let output = self
            .cli(&service_run_args(network, name, alias, service, &mounts))
            .await?;

        if !output.status.success() {
            return Err(EngineError::Provisioning {
                alias: alias.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }

    async fn wait_until_ready(
        &self,
        name: &str,
        alias: &str,
        probe: &[String],
    ) -> Result<(), EngineError> {
        let deadline = Instant::now() + Duration::from_secs(self.config.readiness_timeout_secs);
        let mut args = vec!["exec".to_string(), name.to_string()];
        args.extend(probe.iter().cloned());

        loop {
            // A hung probe must not outlive the deadline
            let remaining = deadline.saturating_duration_since(Instant::now());
            let reason = match timeout(remaining, self.cli(&args)).await {
                Ok(output) => {
                    let output = output?;
                    if output.status.success() {
                        info!("Service {} is ready", alias);
                        return Ok(());
                    }
                    String::from_utf8_lossy(&output.stderr).trim().to_string()
                }
                Err(_) => "readiness probe timed out".to_string(),
            };

            if !self.is_running(name).await {
                return Err(self
                    .provisioning_error(name, alias, "exited before becoming ready".to_string())
                    .await);
            }

            if Instant::now() >= deadline {
                let message = format!(
                    "not ready after {}s: {}",
                    self.config.readiness_timeout_secs, reason
                );
                return Err(self.provisioning_error(name, alias, message).await);
            }

            debug!("Service {} not ready yet", alias);
            sleep(Duration::from_millis(self.config.readiness_interval_ms)).await;
        }
    }

    /// Whether the service container is still up
    async fn is_running(&self, name: &str) -> bool {
        let args = [
            "inspect".to_string(),
            "-f".to_string(),
            "{{.State.Running}}".to_string(),
            name.to_string(),
        ];
        match self.cli(&args).await {
            Ok(output) => {
                output.status.success() && String::from_utf8_lossy(&output.stdout).trim() == "true"
            }
            Err(_) => false,
        }
    }

    /// Provisioning failure carrying the tail of the service's logs
    async fn provisioning_error(&self, name: &str, alias: &str, reason: String) -> EngineError {
        let args = [
            "logs".to_string(),
            "--tail".to_string(),
            SERVICE_LOG_LINES.to_string(),
            name.to_string(),
        ];
        let logs = match self.cli(&args).await {
            Ok(output) => {
                let mut logs = String::from_utf8_lossy(&output.stdout).trim().to_string();
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stderr.trim().is_empty() {
                    if !logs.is_empty() {
                        logs.push('\n');
                    }
                    logs.push_str(stderr.trim());
                }
                logs
            }
            Err(e) => {
                debug!("Failed to read logs of {}: {}", name, e);
                String::new()
            }
        };

        let message = if logs.is_empty() {
            reason
        } else {
            format!("{}\n{}", reason, logs)
        };
        EngineError::Provisioning {
            alias: alias.to_string(),
            message,
        }
    }

    async fn run_in_network(
        &self,
        network: &str,
        container: &Container,
        directories: &[(PathBuf, String)],
        started: &mut Vec<String>,
    ) -> Result<String, EngineError> {
        let mut services = Vec::new();
        for (alias, service) in container.service_bindings() {
            let name = format!("{}-{}", network, alias);
            started.push(name.clone());
            self.start_service(network, alias, service, &name).await?;
            services.push((name, alias, service));
        }

        for (name, alias, service) in &services {
            if let Some(probe) = service.readiness_check() {
                self.wait_until_ready(name, alias, probe).await?;
            }
        }

        let name = format!("{}-run", network);
        started.push(name.clone());
        let args = container_run_args(network, &name, container, directories);

        info!("Running {} in {}", container.image(), name);
        let result = timeout(
            Duration::from_secs(self.config.timeout_secs),
            Command::new(&self.config.binary)
                .args(&args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| EngineError::Timeout(self.config.timeout_secs))?;

        let output = result.map_err(|e| {
            EngineError::Internal(format!("Failed to execute {}: {}", self.config.binary, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            warn!("{} exited with code {}", name, exit_code);
            return Err(EngineError::Execution {
                exit_code,
                stderr: stderr.trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|e| {
            EngineError::Internal(format!("Failed to decode container output: {}", e))
        })?;
        debug!("{} returned {} bytes of output", name, stdout.len());

        Ok(stdout)
    }

    /// Remove started containers and the network; failures are only logged
    async fn cleanup(&self, network: &str, started: &[String]) {
        if !started.is_empty() {
            let mut args = vec!["rm".to_string(), "-f".to_string()];
            args.extend(started.iter().cloned());
            match self.cli(&args).await {
                Ok(output) if output.status.success() => {}
                Ok(output) => debug!(
                    "Removing containers reported: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
                Err(e) => warn!("Failed to remove containers: {}", e),
            }
        }

        let args = ["network".to_string(), "rm".to_string(), network.to_string()];
        match self.cli(&args).await {
            Ok(output) if output.status.success() => debug!("Removed network {}", network),
            Ok(output) => warn!(
                "Failed to remove network {}: {}",
                network,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => warn!("Failed to remove network {}: {}", network, e),
        }
    }
}

#[async_trait]
impl Engine for DockerEngine {
    async fn stdout(&self, container: &Container) -> Result<String, EngineError> {
        container.validate()?;

        // Resolve host paths before anything is created
        let mut directories = Vec::new();
        for (path, host_dir) in container.directories() {
            directories.push((resolve_host_path(host_dir).await?, path.to_string()));
        }

        let network = format!("{}-{}", self.config.network_prefix, Uuid::new_v4().simple());
        let args = ["network".to_string(), "create".to_string(), network.clone()];
        let output = self.cli(&args).await?;
        if !output.status.success() {
            return Err(EngineError::Internal(format!(
                "Failed to create network {}: {}",
                network,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut started = Vec::new();
        let result = self
            .run_in_network(&network, container, &directories, &mut started)
            .await;
        self.cleanup(&network, &started).await;
        result
    }
}

async fn resolve_host_path(path: &Path) -> Result<PathBuf, EngineError> {
    tokio::fs::canonicalize(path)
        .await
        .map_err(|source| EngineError::HostPath {
            path: path.to_path_buf(),
            source,
        })
}

fn env_args<'a>(env: impl IntoIterator<Item = (&'a String, &'a String)>) -> Vec<String> {
    env.into_iter()
        .flat_map(|(name, value)| ["-e".to_string(), format!("{}={}", name, value)])
        .collect()
}

/// Arguments starting a service detached on `network`
fn service_run_args(
    network: &str,
    name: &str,
    alias: &str,
    service: &Service,
    mounts: &[(PathBuf, String)],
) -> Vec<String> {
    let mut args: Vec<String> = [
        "run",
        "-d",
        "--name",
        name,
        "--network",
        network,
        "--network-alias",
        alias,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    args.extend(env_args(service.env_variables()));
    for (host, path) in mounts {
        args.push("-v".to_string());
        args.push(format!("{}:{}:ro", host.display(), path));
    }
    args.push(service.image().to_string());
    args
}

/// Arguments running the container in the foreground on `network`
fn container_run_args(
    network: &str,
    name: &str,
    container: &Container,
    directories: &[(PathBuf, String)],
) -> Vec<String> {
    let mut args: Vec<String> = ["run", "--rm", "--name", name, "--network", network]
        .iter()
        .map(|s| s.to_string())
        .collect();

    args.extend(env_args(container.env_variables()));
    for (host, path) in directories {
        args.push("-v".to_string());
        args.push(format!("{}:{}", host.display(), path));
    }
    for (path, cache) in container.caches() {
        args.push("-v".to_string());
        args.push(format!("{}:{}", cache, path));
    }
    if let Some(workdir) = container.workdir() {
        args.push("-w".to_string());
        args.push(workdir.to_string());
    }

    match container.execs() {
        [single] if !single.is_empty() => {
            args.push("--entrypoint".to_string());
            args.push(single[0].clone());
            args.push(container.image().to_string());
            args.extend(single[1..].iter().cloned());
        }
        execs => {
            args.push("--entrypoint".to_string());
            args.push("/bin/sh".to_string());
            args.push(container.image().to_string());
            args.push("-c".to_string());
            args.push(exec_script(execs));
        }
    }
    args
}

/// Shell script running `execs` in order, stopping at the first failure
///
/// Only the last exec writes to stdout; earlier ones are redirected to
/// stderr so the captured output is the command's own.
fn exec_script(execs: &[Vec<String>]) -> String {
    let mut lines = vec!["set -e".to_string()];
    if let Some((last, setup)) = execs.split_last() {
        for argv in setup {
            lines.push(format!("{} >&2", shell_words::join(argv)));
        }
        lines.push(format!("exec {}", shell_words::join(last)));
    }
    lines.join("\n")
}
