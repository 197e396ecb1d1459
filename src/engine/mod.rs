//! Execution engines and the client pipelines talk to

pub mod config;
pub mod docker;
pub mod error;
pub mod recording;

use crate::core::Container;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub use config::EngineConfig;
pub use docker::DockerEngine;
pub use error::EngineError;
pub use recording::RecordingEngine;

/// Trait for container execution - allows for different implementations
#[async_trait]
pub trait Engine: Send + Sync {
    /// Run the container's exec chain with its services bound
    ///
    /// Returns the stdout of the last exec. Fails if a service cannot be
    /// provisioned, or if any exec exits non-zero.
    async fn stdout(&self, container: &Container) -> Result<String, EngineError>;
}

/// Execution client handed to every pipeline function
///
/// Cheap to clone; all clones share the same engine.
#[derive(Clone)]
pub struct Client {
    engine: Arc<dyn Engine>,
}

impl Client {
    /// Create a client backed by `engine`
    pub fn new<E: Engine + 'static>(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Create a client from an engine that is shared elsewhere
    pub fn from_shared(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Start a container descriptor from an image
    pub fn container(&self, image: impl Into<String>) -> Container {
        Container::from_image(image)
    }

    /// Execute `container` and wait for the captured stdout
    ///
    /// The descriptor is validated first; a composition error is returned
    /// without the engine starting anything.
    pub async fn stdout(&self, container: &Container) -> Result<String, EngineError> {
        container.validate()?;
        debug!(
            "Executing container {} ({} execs, {} services)",
            container.image(),
            container.execs().len(),
            container.service_bindings().len()
        );
        self.engine.stdout(container).await
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}
