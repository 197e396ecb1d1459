//! Pipeline registration and execution

pub mod registry;
pub mod runner;

pub use registry::{PipelineError, PipelineFuture, PipelineRegistry, RegisteredPipeline};
pub use runner::{EntryPoint, EventHandler, ExecutionEvent, PipelineRunner, RunError};
