//! Database services

use crate::core::Service;
use crate::engine::Client;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Options for [`Client::db_service`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbServiceOptions {
    /// Environment passed to the service
    pub env: BTreeMap<String, String>,

    /// Host directory -> container path of init scripts
    pub init_script_dirs: BTreeMap<PathBuf, String>,
}

impl DbServiceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    pub fn with_init_scripts(
        mut self,
        host_dir: impl Into<PathBuf>,
        container_path: impl Into<String>,
    ) -> Self {
        self.init_script_dirs
            .insert(host_dir.into(), container_path.into());
        self
    }
}

/// Database engines with a known readiness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DbKind {
    Postgres,
    MySql,
    MariaDb,
}

impl DbKind {
    fn from_image(image: &str) -> Option<Self> {
        // registry/namespace/name:tag@digest -> name
        let name = image.rsplit('/').next().unwrap_or(image);
        let name = name.split(['@', ':']).next().unwrap_or(name);

        match name {
            "postgres" | "postgis" => Some(DbKind::Postgres),
            "mysql" => Some(DbKind::MySql),
            "mariadb" => Some(DbKind::MariaDb),
            _ => None,
        }
    }

    /// Probe that only passes once the server accepts TCP connections
    ///
    /// The official images run init scripts against a socket-only server,
    /// so probing over TCP also waits for initialization to finish.
    fn readiness_check(self, env: &BTreeMap<String, String>) -> Vec<String> {
        match self {
            DbKind::Postgres => {
                let user = env
                    .get("POSTGRES_USER")
                    .cloned()
                    .unwrap_or_else(|| "postgres".to_string());
                let db = env.get("POSTGRES_DB").cloned().unwrap_or_else(|| user.clone());
                vec![
                    "pg_isready".to_string(),
                    "-h".to_string(),
                    "127.0.0.1".to_string(),
                    "-U".to_string(),
                    user,
                    "-d".to_string(),
                    db,
                ]
            }
            DbKind::MySql => ["mysqladmin", "ping", "-h", "127.0.0.1", "--silent"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            DbKind::MariaDb => ["mariadb-admin", "ping", "-h", "127.0.0.1", "--silent"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Client {
    /// Describe an ephemeral database service
    ///
    /// Known database images get a readiness probe, so a container binding
    /// the service only starts once the database accepts connections.
    pub fn db_service(&self, image: &str, options: DbServiceOptions) -> Service {
        let mut service = Service::new(image);
        for (name, value) in &options.env {
            service = service.with_env_variable(name, value);
        }
        for (host_dir, path) in &options.init_script_dirs {
            service = service.with_init_scripts(host_dir.clone(), path);
        }
        if let Some(kind) = DbKind::from_image(image) {
            service = service.with_readiness_check(kind.readiness_check(&options.env));
        }
        service
    }
}
