//! Engine configuration

/// Configuration for the container CLI engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path to the container CLI
    ///
    /// Anything that speaks the docker CLI (`docker`, `podman`).
    /// Defaults to "docker" (assumes it's on PATH).
    pub binary: String,

    /// Timeout for the command run in the container, in seconds
    pub timeout_secs: u64,

    /// How long a bound service may take to pass its readiness probe
    pub readiness_timeout_secs: u64,

    /// Delay between readiness probes, in milliseconds
    pub readiness_interval_ms: u64,

    /// Prefix for the per-execution network and service container names
    pub network_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            timeout_secs: 3600,
            readiness_timeout_secs: 120,
            readiness_interval_ms: 500,
            network_prefix: "scabbard".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_readiness_timeout(mut self, timeout_secs: u64) -> Self {
        self.readiness_timeout_secs = timeout_secs;
        self
    }

    pub fn with_readiness_interval(mut self, interval_ms: u64) -> Self {
        self.readiness_interval_ms = interval_ms;
        self
    }

    pub fn with_network_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.network_prefix = prefix.into();
        self
    }
}
