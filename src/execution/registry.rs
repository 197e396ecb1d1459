//! Pipeline registry - the queue of pipeline functions

use crate::engine::{Client, EngineError};
use crate::scope::{InjectError, Injector};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Errors a pipeline function can fail with
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Inject(#[from] InjectError),
}

/// Future returned by a pipeline function; resolves to the captured output
pub type PipelineFuture = Pin<Box<dyn Future<Output = Result<String, PipelineError>> + Send>>;

type PipelineFn = Arc<dyn Fn(Client, Injector) -> PipelineFuture + Send + Sync>;

/// A pipeline function and the name it was registered under
#[derive(Clone)]
pub struct RegisteredPipeline {
    name: String,
    func: PipelineFn,
}

impl RegisteredPipeline {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start the pipeline function
    pub fn call(&self, client: Client, injector: Injector) -> PipelineFuture {
        (self.func)(client, injector)
    }
}

impl fmt::Debug for RegisteredPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredPipeline")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of pipeline functions
#[derive(Debug, Clone, Default)]
pub struct PipelineRegistry {
    pipelines: Vec<RegisteredPipeline>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pipeline function
    ///
    /// Nothing runs here; the function is only called when the registry is
    /// executed, so failures surface there.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(Client, Injector) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, PipelineError>> + Send + 'static,
    {
        let func: PipelineFn = Arc::new(move |client, injector| Box::pin(func(client, injector)));
        self.pipelines.push(RegisteredPipeline {
            name: name.into(),
            func,
        });
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Registered names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.pipelines.iter().map(|p| p.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredPipeline> {
        self.pipelines.iter()
    }
}
