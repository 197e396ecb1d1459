//! Recording engine - captures descriptors instead of running them

use crate::core::Container;
use crate::engine::{Engine, EngineError};
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

/// Engine that records every container it is asked to execute
///
/// Used by `scabbard plan` to show what a pipeline would run, and by tests
/// that only care about the composed descriptors.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    output: String,
    executed: Mutex<Vec<Container>>,
}

impl RecordingEngine {
    /// Create a recording engine that returns empty stdout
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recording engine that returns `output` for every execution
    pub fn with_output(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Containers executed so far, in order
    pub fn executed(&self) -> Vec<Container> {
        self.executed
            .lock()
            .map(|executed| executed.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Engine for RecordingEngine {
    async fn stdout(&self, container: &Container) -> Result<String, EngineError> {
        info!(
            "Recording container {} with command {:?}",
            container.image(),
            container.command().unwrap_or_default()
        );
        self.executed
            .lock()
            .map_err(|e| EngineError::Internal(format!("recording lock poisoned: {}", e)))?
            .push(container.clone());
        Ok(self.output.clone())
    }
}
