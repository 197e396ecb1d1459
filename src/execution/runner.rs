//! Pipeline runner - executes a registry when started from the entry point

use crate::{
    core::{ExecutionStatus, RunState},
    engine::Client,
    execution::registry::{PipelineError, PipelineRegistry},
    scope::{Injector, ScopeRegistry},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

/// How the program was started
///
/// Pipelines only run from [`EntryPoint::Main`]; a library embedding the
/// same registry passes [`EntryPoint::Library`] and nothing executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    Main,
    Library,
}

impl From<bool> for EntryPoint {
    fn from(is_main: bool) -> Self {
        if is_main {
            EntryPoint::Main
        } else {
            EntryPoint::Library
        }
    }
}

/// Events that can occur during a run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted {
        execution_id: Uuid,
        pipelines: Vec<String>,
    },
    PipelineStarted {
        name: String,
    },
    PipelineCompleted {
        name: String,
        output: String,
    },
    PipelineFailed {
        name: String,
        error: String,
    },
    PipelineSkipped {
        name: String,
    },
    RunCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&ExecutionEvent) + Send + Sync>;

/// A run that stopped because a pipeline failed
#[derive(Debug, Error)]
pub enum RunError {
    #[error("pipeline '{name}' failed: {source}")]
    PipelineFailed {
        name: String,
        #[source]
        source: PipelineError,
        state: Box<RunState>,
    },
}

impl RunError {
    /// State of the run at the point it stopped
    pub fn state(&self) -> &RunState {
        match self {
            RunError::PipelineFailed { state, .. } => state,
        }
    }
}

/// Executes registered pipelines against one client and one injector
pub struct PipelineRunner {
    client: Client,
    injector: Injector,
    event_handlers: Vec<EventHandler>,
}

impl PipelineRunner {
    /// Create a runner; scopes are resolved lazily and shared by all
    /// pipelines of the runner
    pub fn new(client: Client, scopes: ScopeRegistry) -> Self {
        let injector = scopes.build(client.clone());
        Self {
            client,
            injector,
            event_handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(&event);
        }
    }

    /// Run every pipeline of `registry` in registration order
    ///
    /// With [`EntryPoint::Library`] nothing runs and the returned state is
    /// `Skipped`. Otherwise the first failing pipeline stops the run; the
    /// pipelines after it are marked skipped and the error is returned.
    pub async fn execute(
        &self,
        registry: &PipelineRegistry,
        entry: EntryPoint,
    ) -> Result<RunState, RunError> {
        let mut state = RunState::new(registry.names());
        let execution_id = state.execution_id;

        if entry == EntryPoint::Library {
            debug!("Not the entry point, skipping {} pipelines", registry.len());
            state.skip();
            self.emit_event(ExecutionEvent::RunCompleted {
                execution_id,
                status: ExecutionStatus::Skipped,
            });
            return Ok(state);
        }

        info!("Starting run {} ({} pipelines)", execution_id, registry.len());
        state.start();
        self.emit_event(ExecutionEvent::RunStarted {
            execution_id,
            pipelines: registry.names().into_iter().map(String::from).collect(),
        });

        for (index, pipeline) in registry.iter().enumerate() {
            let name = pipeline.name().to_string();
            info!("Starting pipeline: {}", name);
            state.pipelines[index].start();
            self.emit_event(ExecutionEvent::PipelineStarted { name: name.clone() });

            match pipeline
                .call(self.client.clone(), self.injector.clone())
                .await
            {
                Ok(output) => {
                    info!("Pipeline {} completed", name);
                    state.pipelines[index].complete(output.clone());
                    self.emit_event(ExecutionEvent::PipelineCompleted { name, output });
                }
                Err(e) => {
                    error!("Pipeline {} failed: {}", name, e);
                    state.pipelines[index].fail(e.to_string());
                    self.emit_event(ExecutionEvent::PipelineFailed {
                        name: name.clone(),
                        error: e.to_string(),
                    });

                    for later in &mut state.pipelines[index + 1..] {
                        later.skip();
                        self.emit_event(ExecutionEvent::PipelineSkipped {
                            name: later.name.clone(),
                        });
                    }

                    state.fail();
                    self.emit_event(ExecutionEvent::RunCompleted {
                        execution_id,
                        status: ExecutionStatus::Failed,
                    });
                    return Err(RunError::PipelineFailed {
                        name,
                        source: e,
                        state: Box::new(state),
                    });
                }
            }
        }

        state.complete();
        info!("Run {} finished", execution_id);
        self.emit_event(ExecutionEvent::RunCompleted {
            execution_id,
            status: ExecutionStatus::Completed,
        });

        Ok(state)
    }
}
