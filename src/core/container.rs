//! Container descriptor - an immutable, composable container-to-be-run

use crate::core::service::Service;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

static ENV_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

// RFC 1123 label
static HOST_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").unwrap());

/// Invalid configuration found while validating a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    #[error("container has no image")]
    MissingImage,

    #[error("invalid environment variable name '{0}'")]
    InvalidEnvName(String),

    #[error("environment variable '{0}' contains a NUL byte")]
    InvalidEnvValue(String),

    #[error("invalid service alias '{0}'")]
    InvalidAlias(String),

    #[error("service '{alias}' has no image")]
    ServiceWithoutImage { alias: String },

    #[error("mount path '{0}' must be absolute")]
    RelativeMountPath(String),

    #[error("container has nothing to execute")]
    MissingCommand,

    #[error("exec #{0} has an empty argument list")]
    EmptyExec(usize),
}

/// A container to be run by an engine
///
/// Each `with_*` method returns a new descriptor and never mutates the
/// receiver, so a partially composed container can be reused as the base
/// of several branches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Base image reference
    image: String,

    /// Environment variables
    env: BTreeMap<String, String>,

    /// Bound services (network alias -> service)
    services: BTreeMap<String, Service>,

    /// Container path -> host directory
    directories: BTreeMap<String, PathBuf>,

    /// Container path -> named cache volume
    caches: BTreeMap<String, String>,

    /// Working directory
    workdir: Option<String>,

    /// Exec chain; stdout of the last entry is the container's output
    execs: Vec<Vec<String>>,
}

impl Container {
    /// Start a descriptor from an image reference
    pub fn from_image(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            env: BTreeMap::new(),
            services: BTreeMap::new(),
            directories: BTreeMap::new(),
            caches: BTreeMap::new(),
            workdir: None,
            execs: Vec::new(),
        }
    }

    /// Set an environment variable (last write wins)
    #[must_use]
    pub fn with_env_variable(&self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.env.insert(name.into(), value.into());
        next
    }

    /// Remove an environment variable
    #[must_use]
    pub fn without_env_variable(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.env.remove(name);
        next
    }

    /// Bind a service, reachable from this container under `alias`
    #[must_use]
    pub fn with_service_binding(&self, alias: impl Into<String>, service: &Service) -> Self {
        let mut next = self.clone();
        next.services.insert(alias.into(), service.clone());
        next
    }

    /// Mount a host directory at `path`
    #[must_use]
    pub fn with_directory(&self, path: impl Into<String>, host_dir: impl Into<PathBuf>) -> Self {
        let mut next = self.clone();
        next.directories.insert(path.into(), host_dir.into());
        next
    }

    /// Mount a named cache volume at `path`
    #[must_use]
    pub fn with_mounted_cache(&self, path: impl Into<String>, cache: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.caches.insert(path.into(), cache.into());
        next
    }

    #[must_use]
    pub fn with_workdir(&self, path: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.workdir = Some(path.into());
        next
    }

    /// Append a command to the exec chain
    ///
    /// Earlier execs prepare the container; the last one is the command
    /// whose stdout is captured.
    #[must_use]
    pub fn with_exec<I, S>(&self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        next.execs.push(args.into_iter().map(Into::into).collect());
        next
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn env_variable(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    pub fn env_variables(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn service_bindings(&self) -> &BTreeMap<String, Service> {
        &self.services
    }

    pub fn directories(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.directories
            .iter()
            .map(|(path, host)| (path.as_str(), host.as_path()))
    }

    pub fn caches(&self) -> impl Iterator<Item = (&str, &str)> {
        self.caches
            .iter()
            .map(|(path, cache)| (path.as_str(), cache.as_str()))
    }

    pub fn workdir(&self) -> Option<&str> {
        self.workdir.as_deref()
    }

    pub fn execs(&self) -> &[Vec<String>] {
        &self.execs
    }

    /// The command whose output is captured (last exec)
    pub fn command(&self) -> Option<&[String]> {
        self.execs.last().map(Vec::as_slice)
    }

    /// Check the descriptor before it is handed to an engine
    pub fn validate(&self) -> Result<(), CompositionError> {
        if self.image.trim().is_empty() {
            return Err(CompositionError::MissingImage);
        }

        validate_env(&self.env)?;

        for (alias, service) in &self.services {
            if !HOST_ALIAS.is_match(alias) {
                return Err(CompositionError::InvalidAlias(alias.clone()));
            }
            if service.image().trim().is_empty() {
                return Err(CompositionError::ServiceWithoutImage {
                    alias: alias.clone(),
                });
            }
            validate_env(service.env_variables())?;
            for (_, path) in service.init_script_dirs() {
                if !path.starts_with('/') {
                    return Err(CompositionError::RelativeMountPath(path.to_string()));
                }
            }
        }

        for path in self.directories.keys().chain(self.caches.keys()) {
            if !path.starts_with('/') {
                return Err(CompositionError::RelativeMountPath(path.clone()));
            }
        }

        if self.execs.is_empty() {
            return Err(CompositionError::MissingCommand);
        }
        if let Some(index) = self.execs.iter().position(|argv| argv.is_empty()) {
            return Err(CompositionError::EmptyExec(index));
        }

        Ok(())
    }
}

fn validate_env(env: &BTreeMap<String, String>) -> Result<(), CompositionError> {
    for (name, value) in env {
        if !ENV_NAME.is_match(name) {
            return Err(CompositionError::InvalidEnvName(name.clone()));
        }
        if value.contains('\0') {
            return Err(CompositionError::InvalidEnvValue(name.clone()));
        }
    }
    Ok(())
}
