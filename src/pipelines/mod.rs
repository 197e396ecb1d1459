//! Pipelines shipped with the binary


use crate::core::config::PipelineConfig;
use crate::execution::PipelineRegistry;
use crate::scope::{rust, ScopeRegistry};

/// Scopes the shipped pipelines inject
pub fn scopes(config: &PipelineConfig) -> ScopeRegistry {
    rust::provide(ScopeRegistry::new(), &config.toolchain)
}

/// Registry holding every shipped pipeline
pub fn registry(config: &PipelineConfig) -> PipelineRegistry {
    let mut registry = PipelineRegistry::new();
    adapter_test::register(&mut registry, config.clone());
    registry
}
