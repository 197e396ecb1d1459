//! Core domain models
//!
//! Immutable container and service descriptors, the pipeline
//! configuration, and run state.

pub mod config;
pub mod container;
pub mod service;
pub mod state;

pub use container::*;
pub use service::*;
pub use state::*;
