//! Pipeline configuration from YAML
//!
//! Every field has a default, so an empty document (or no file at all)
//! describes the stock test pipeline: Postgres 16.2 bound as `db`, and
//! `cargo hack --feature-powerset test` run in an Alpine Rust toolchain.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Characters that would change the meaning of a connection URL
const URL_RESERVED: &[char] = &[':', '@', '/', '?', '#', '%'];

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name the pipeline is registered under
    pub name: String,

    /// Ephemeral database service
    pub database: DatabaseConfig,

    /// Toolchain container the tests run in
    pub toolchain: ToolchainConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "test".to_string(),
            database: DatabaseConfig::default(),
            toolchain: ToolchainConfig::default(),
        }
    }
}

/// Database service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Service image reference
    pub image: String,

    /// Network alias the toolchain container reaches the service under
    pub alias: String,

    /// Database name (`POSTGRES_DB`)
    pub name: String,

    /// Database user (`POSTGRES_USER`)
    pub user: String,

    /// Database password (`POSTGRES_PASSWORD`)
    pub password: String,

    /// Host directory -> container path of init scripts
    pub init_scripts: BTreeMap<PathBuf, String>,

    /// Extra environment passed to the service
    pub env: BTreeMap<String, String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            image: "postgres:16.2".to_string(),
            alias: "db".to_string(),
            name: "winvoice-adapter".to_string(),
            user: "user".to_string(),
            password: "password".to_string(),
            init_scripts: BTreeMap::from([(
                PathBuf::from("src/schema/initializable"),
                "/docker-entrypoint-initdb.d".to_string(),
            )]),
            env: BTreeMap::new(),
        }
    }
}

impl DatabaseConfig {
    /// Connection string for the bound service, using the same credentials
    /// the service is configured with
    pub fn connection_url(&self) -> String {
        format!(
            "postgresql://{}:{}@{}/{}",
            self.user, self.password, self.alias, self.name
        )
    }

    /// Environment the service is started with
    pub fn service_env(&self) -> BTreeMap<String, String> {
        let mut env = self.env.clone();
        env.insert("POSTGRES_DB".to_string(), self.name.clone());
        env.insert("POSTGRES_PASSWORD".to_string(), self.password.clone());
        env.insert("POSTGRES_USER".to_string(), self.user.clone());
        env
    }
}

/// Feature combinations the test command runs over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureMatrix {
    /// Every combination of features (`cargo hack --feature-powerset`)
    FeaturePowerset,
    /// Each feature on its own (`cargo hack --each-feature`)
    EachFeature,
    /// Plain cargo, default features only
    None,
}

impl Default for FeatureMatrix {
    fn default() -> Self {
        FeatureMatrix::FeaturePowerset
    }
}

/// Toolchain container configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Toolchain image reference
    pub image: String,

    /// Host directory holding the project source
    pub source: PathBuf,

    /// Where the source is mounted; also the working directory
    pub workdir: String,

    /// Alpine packages installed before building
    pub packages: Vec<String>,

    /// `RUSTFLAGS` for the test command (unset when `None`)
    pub rustflags: Option<String>,

    /// Feature matrix for the test command
    pub matrix: FeatureMatrix,

    /// Cargo subcommand and arguments (e.g. `["test", "--workspace"]`)
    pub command: Vec<String>,

    /// Prefix for the named cache volumes
    pub cache_prefix: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            image: "rust:1-alpine".to_string(),
            source: PathBuf::from("."),
            workdir: "/src".to_string(),
            packages: vec!["musl-dev".to_string()],
            rustflags: Some("-C target-feature=-crt-static".to_string()),
            matrix: FeatureMatrix::FeaturePowerset,
            command: vec!["test".to_string()],
            cache_prefix: "scabbard".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = if yaml.trim().is_empty() {
            PipelineConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Pipeline name must not be empty");
        }

        let db = &self.database;
        if db.image.trim().is_empty() {
            anyhow::bail!("Database image must not be empty");
        }
        if db.alias.trim().is_empty() {
            anyhow::bail!("Database alias must not be empty");
        }
        for (field, value) in [("name", &db.name), ("user", &db.user), ("password", &db.password)] {
            if value.is_empty() {
                anyhow::bail!("Database {} must not be empty", field);
            }
            if value.contains(URL_RESERVED) {
                anyhow::bail!(
                    "Database {} '{}' contains a character reserved in connection URLs",
                    field,
                    value
                );
            }
        }
        for (host, path) in &db.init_scripts {
            if !path.starts_with('/') {
                anyhow::bail!(
                    "Init scripts from '{}' must be mounted at an absolute path, got '{}'",
                    host.display(),
                    path
                );
            }
        }

        let toolchain = &self.toolchain;
        if toolchain.image.trim().is_empty() {
            anyhow::bail!("Toolchain image must not be empty");
        }
        if !toolchain.workdir.starts_with('/') {
            anyhow::bail!("Toolchain workdir must be absolute, got '{}'", toolchain.workdir);
        }
        if toolchain.command.is_empty() {
            anyhow::bail!("Toolchain command must not be empty");
        }

        Ok(())
    }
}
