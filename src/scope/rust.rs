//! Rust toolchain scopes

use crate::core::config::{FeatureMatrix, ToolchainConfig};
use crate::core::Container;
use crate::scope::{ScopeRegistry, ScopeToken};

/// Toolchain container: source mounted, build deps installed, cargo caches
pub const RUST: ScopeToken<Container> = ScopeToken::new("rust");

/// [`RUST`] with `cargo-hack` available for [`CargoHackExt`]
pub const WITH_CARGO_HACK: ScopeToken<Container> = ScopeToken::new("rust/cargo-hack");

const CARGO_HOME: &str = "/usr/local/cargo";

/// Install root for cargo tools; lives on a cache volume so tools are
/// built once rather than on every run
const TOOLS_ROOT: &str = "/usr/local/cargo-tools";

/// Register [`RUST`] and [`WITH_CARGO_HACK`]
pub fn provide(scopes: ScopeRegistry, config: &ToolchainConfig) -> ScopeRegistry {
    let prefix = config.cache_prefix.clone();
    scopes
        .provide_value(RUST, rust_container(config))
        .provide(WITH_CARGO_HACK, move |injector, _| {
            let prefix = prefix.clone();
            async move {
                let rust = injector.inject(&RUST).await?;
                Ok(with_cargo_hack(&rust, &prefix))
            }
        })
}

/// Build the base toolchain container
pub fn rust_container(config: &ToolchainConfig) -> Container {
    let prefix = &config.cache_prefix;
    let container = Container::from_image(&config.image)
        .with_directory(&config.workdir, config.source.clone())
        .with_workdir(&config.workdir)
        .with_mounted_cache(
            format!("{}/registry", CARGO_HOME),
            format!("{}-cargo-registry", prefix),
        )
        .with_mounted_cache(format!("{}/git", CARGO_HOME), format!("{}-cargo-git", prefix))
        .with_mounted_cache(
            format!("{}/target", config.workdir.trim_end_matches('/')),
            format!("{}-target", prefix),
        );

    if config.packages.is_empty() {
        return container;
    }

    let mut apk = vec!["apk".to_string(), "add".to_string(), "--no-cache".to_string()];
    apk.extend(config.packages.iter().cloned());
    container.with_exec(apk)
}

fn with_cargo_hack(rust: &Container, prefix: &str) -> Container {
    rust.with_mounted_cache(TOOLS_ROOT, format!("{}-cargo-tools", prefix))
        .with_exec(["cargo", "install", "--locked", "--root", TOOLS_ROOT, "cargo-hack"])
}

/// Run cargo commands through `cargo hack`
pub trait CargoHackExt {
    /// Set the command to `cargo <args>` run over `matrix`
    #[must_use]
    fn with_exec_cargo_hack<S: AsRef<str>>(&self, matrix: FeatureMatrix, args: &[S]) -> Self;
}

impl CargoHackExt for Container {
    fn with_exec_cargo_hack<S: AsRef<str>>(&self, matrix: FeatureMatrix, args: &[S]) -> Self {
        let hack = format!("{}/bin/cargo-hack", TOOLS_ROOT);
        let mut argv: Vec<String> = match matrix {
            FeatureMatrix::FeaturePowerset => vec![hack, "hack".to_string(), "--feature-powerset".to_string()],
            FeatureMatrix::EachFeature => vec![hack, "hack".to_string(), "--each-feature".to_string()],
            FeatureMatrix::None => vec!["cargo".to_string()],
        };
        argv.extend(args.iter().map(|arg| arg.as_ref().to_string()));
        self.with_exec(argv)
    }
}
