//! Service descriptor - an ephemeral dependency container

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Declarative description of a service container (e.g. a database)
///
/// A service is started by the engine when a container that binds it is
/// executed, and torn down afterwards. Every `with_*` method returns a new
/// descriptor; the receiver is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Image reference (e.g. `postgres:16.2`)
    image: String,

    /// Environment variables passed to the service
    env: BTreeMap<String, String>,

    /// Host directory -> container path, mounted read-only before first boot
    init_script_dirs: BTreeMap<PathBuf, String>,

    /// Command run inside the service until it exits 0
    readiness_check: Option<Vec<String>>,
}

impl Service {
    /// Create a service descriptor for an image
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            env: BTreeMap::new(),
            init_script_dirs: BTreeMap::new(),
            readiness_check: None,
        }
    }

    /// Set an environment variable (last write wins)
    #[must_use]
    pub fn with_env_variable(&self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.env.insert(name.into(), value.into());
        next
    }

    /// Mount a host directory of initialization scripts at `container_path`
    #[must_use]
    pub fn with_init_scripts(
        &self,
        host_dir: impl Into<PathBuf>,
        container_path: impl Into<String>,
    ) -> Self {
        let mut next = self.clone();
        next.init_script_dirs
            .insert(host_dir.into(), container_path.into());
        next
    }

    /// Set the readiness probe
    #[must_use]
    pub fn with_readiness_check<I, S>(&self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        next.readiness_check = Some(args.into_iter().map(Into::into).collect());
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

    pub fn init_script_dirs(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.init_script_dirs
            .iter()
            .map(|(host, path)| (host.as_path(), path.as_str()))
    }

    pub fn readiness_check(&self) -> Option<&[String]> {
        self.readiness_check.as_deref()
    }
}
