//! scabbard - composable CI pipelines run in containers
//!
//! Pipelines are async functions registered on a [`PipelineRegistry`]. Each
//! one composes immutable [`Container`] descriptors, binds [`Service`]s into
//! them, and asks the [`Client`] to execute the result through an
//! [`Engine`]. Reusable fragments such as a prepared toolchain container are
//! provided as typed scopes and resolved through an [`Injector`].

pub mod cli;
pub mod core;
pub mod engine;
pub mod execution;
pub mod persistence;
pub mod pipelines;
pub mod scope;

// Re-export commonly used types
pub use core::{CompositionError, Container, ExecutionStatus, RunState, Service};
pub use engine::{Client, DockerEngine, Engine, EngineConfig, EngineError, RecordingEngine};
pub use execution::{EntryPoint, ExecutionEvent, PipelineError, PipelineRegistry, PipelineRunner, RunError};
pub use scope::{InjectError, Injector, ScopeRegistry, ScopeToken};
