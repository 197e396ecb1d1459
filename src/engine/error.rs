//! Engine error types

use crate::core::CompositionError;
use std::path::PathBuf;
use thiserror::Error;

/// Error types for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// The descriptor was rejected before anything was started
    #[error("invalid container configuration: {0}")]
    Composition(#[from] CompositionError),

    /// A bound service failed to start or never became ready
    #[error("service '{alias}' failed to start: {message}")]
    Provisioning { alias: String, message: String },

    /// A host directory to be mounted could not be resolved
    #[error("cannot mount host path {}: {source}", path.display())]
    HostPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The command exited non-zero or the container crashed
    #[error("command exited with code {exit_code}: {stderr}")]
    Execution { exit_code: i32, stderr: String },

    #[error("timeout after {0} seconds")]
    Timeout(u64),

    #[error("internal error: {0}")]
    Internal(String),
}
