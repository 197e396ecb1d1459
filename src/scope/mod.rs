//! Scope injection - typed, reusable pipeline fragments
//!
//! A scope is a named value (usually a pre-configured [`Container`]) built
//! by an async factory. Pipelines ask an [`Injector`] for a scope through a
//! [`ScopeToken`], which carries the scope's type, so resolution hands back
//! a `T` directly or a typed [`InjectError`].
//!
//! ```
//! use scabbard::core::Container;
//! use scabbard::engine::{Client, RecordingEngine};
//! use scabbard::scope::{ScopeRegistry, ScopeToken};
//!
//! const ALPINE: ScopeToken<Container> = ScopeToken::new("alpine");
//!
//! # async fn example() -> Result<(), scabbard::scope::InjectError> {
//! let injector = ScopeRegistry::new()
//!     .provide(ALPINE, |_, client| async move { Ok(client.container("alpine:3")) })
//!     .build(Client::new(RecordingEngine::new()));
//!
//! let alpine: Container = injector.inject(&ALPINE).await?;
//! assert_eq!(alpine.image(), "alpine:3");
//! # Ok(())
//! # }
//! ```
//!
//! [`Container`]: crate::core::Container

pub mod db;
pub mod rust;

use crate::engine::Client;
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::debug;

/// Errors resolving a scope
#[derive(Debug, Error)]
pub enum InjectError {
    #[error("no scope registered for '{0}'")]
    NotFound(String),

    #[error("scope '{name}' does not provide a {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("scope cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("failed to resolve scope '{name}': {source}")]
    Resolution {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl InjectError {
    /// Wrap a factory failure
    pub fn resolution(
        name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        InjectError::Resolution {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Typed name of a scope
pub struct ScopeToken<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ScopeToken<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for ScopeToken<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ScopeToken<T> {}

impl<T> fmt::Debug for ScopeToken<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeToken<{}>({})", type_name::<T>(), self.name)
    }
}

type Resolved = Arc<dyn Any + Send + Sync>;
type ScopeFuture = Pin<Box<dyn Future<Output = Result<Resolved, InjectError>> + Send>>;
type ScopeFactory = Arc<dyn Fn(Injector, Client) -> ScopeFuture + Send + Sync>;

/// Scope factories, before they are bound to a client
#[derive(Clone, Default)]
pub struct ScopeRegistry {
    factories: HashMap<&'static str, ScopeFactory>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for `token`, replacing any previous one
    ///
    /// The factory receives an injector (to resolve the scopes it builds
    /// on) and the execution client.
    pub fn provide<T, F, Fut>(mut self, token: ScopeToken<T>, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Injector, Client) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, InjectError>> + Send + 'static,
    {
        let factory: ScopeFactory = Arc::new(move |injector, client| {
            let future = factory(injector, client);
            Box::pin(async move { Ok(Arc::new(future.await?) as Resolved) })
        });
        self.factories.insert(token.name(), factory);
        self
    }

    /// Register a ready-made value for `token`
    pub fn provide_value<T>(self, token: ScopeToken<T>, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.provide(token, move |_, _| {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered scope names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Bind the factories to a client
    pub fn build(self, client: Client) -> Injector {
        let scopes = self
            .factories
            .into_iter()
            .map(|(name, factory)| {
                let scope = Scope {
                    factory,
                    cell: OnceCell::new(),
                };
                (name, scope)
            })
            .collect();

        Injector {
            inner: Arc::new(InjectorInner { scopes, client }),
            path: Vec::new(),
        }
    }
}

struct Scope {
    factory: ScopeFactory,
    cell: OnceCell<Resolved>,
}

struct InjectorInner {
    scopes: HashMap<&'static str, Scope>,
    client: Client,
}

/// Resolves scopes; each scope is built at most once per injector
#[derive(Clone)]
pub struct Injector {
    inner: Arc<InjectorInner>,
    /// Scopes being resolved by the caller, outermost first
    path: Vec<&'static str>,
}

impl Injector {
    /// Resolve the scope behind `token`
    pub async fn inject<T>(&self, token: &ScopeToken<T>) -> Result<T, InjectError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let name = token.name();
        if self.path.contains(&name) {
            let mut chain: Vec<String> = self.path.iter().map(|s| s.to_string()).collect();
            chain.push(name.to_string());
            return Err(InjectError::Cycle(chain));
        }

        let scope = self
            .inner
            .scopes
            .get(name)
            .ok_or_else(|| InjectError::NotFound(name.to_string()))?;

        let resolved = scope
            .cell
            .get_or_try_init(|| {
                debug!("Resolving scope {}", name);
                let mut path = self.path.clone();
                path.push(name);
                let nested = Injector {
                    inner: Arc::clone(&self.inner),
                    path,
                };
                (scope.factory)(nested, self.inner.client.clone())
            })
            .await?;

        resolved
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| InjectError::TypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    pub fn client(&self) -> &Client {
        &self.inner.client
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.inner.scopes.keys().collect();
        names.sort_unstable();
        f.debug_struct("Injector")
            .field("scopes", &names)
            .field("path", &self.path)
            .finish()
    }
}
