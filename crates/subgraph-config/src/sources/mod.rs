//! Environment resolver strategies
//!
//! This module provides the strategies that turn the raw process environment
//! into a [`ResolvedConfiguration`]:
//! - Identity: the environment verbatim
//! - Secrets directory: mounted secret files layered over the environment
//! - Hook: any caller-supplied async transformation

mod secrets;

pub use secrets::{DEFAULT_SECRETS_DIR, SecretsDirResolver};

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tracing::debug;

use crate::resolved::{RawEnvironment, ResolvedConfiguration};
use crate::ConfigError;

/// Environment variable selecting the secrets directory strategy
pub const SECRETS_DIR_VAR: &str = "SUBGRAPH_SECRETS_DIR";

/// Trait for environment resolution strategies
#[async_trait]
pub trait EnvironmentResolver: Send + Sync {
    /// Name of this strategy (for logging and debugging)
    fn name(&self) -> &str;

    /// Produce the resolved configuration from the raw environment
    async fn resolve(&self, raw: RawEnvironment) -> Result<ResolvedConfiguration, ConfigError>;
}

/// Passes the raw environment through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

#[async_trait]
impl EnvironmentResolver for IdentityResolver {
    fn name(&self) -> &str {
        "identity"
    }

    async fn resolve(&self, raw: RawEnvironment) -> Result<ResolvedConfiguration, ConfigError> {
        Ok(ResolvedConfiguration::new(raw.into_vars()))
    }
}

type HookFn = dyn Fn(RawEnvironment) -> BoxFuture<'static, Result<HashMap<String, String>, ConfigError>>
    + Send
    + Sync;

/// Wraps a caller-supplied async override hook.
///
/// The hook receives the raw environment and returns the mapping to use,
/// typically the environment augmented with values fetched from a secret
/// store.
#[derive(Clone)]
pub struct HookResolver {
    name: String,
    hook: Arc<HookFn>,
}

impl HookResolver {
    pub fn new<F, Fut>(name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(RawEnvironment) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HashMap<String, String>, ConfigError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            hook: Arc::new(move |raw| Box::pin(hook(raw))),
        }
    }
}

impl std::fmt::Debug for HookResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookResolver")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EnvironmentResolver for HookResolver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, raw: RawEnvironment) -> Result<ResolvedConfiguration, ConfigError> {
        let values = (self.hook)(raw).await?;
        Ok(ResolvedConfiguration::new(values))
    }
}

/// Strategy selected explicitly at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverStrategy {
    Identity,
    SecretsDir(PathBuf),
}

impl ResolverStrategy {
    /// Pick the strategy from the raw environment.
    ///
    /// `SUBGRAPH_SECRETS_DIR` (non-empty) selects the secrets directory
    /// strategy; anything else falls back to identity.
    pub fn from_env(raw: &RawEnvironment) -> Self {
        match raw.get(SECRETS_DIR_VAR).map(str::trim) {
            Some(dir) if !dir.is_empty() => Self::SecretsDir(PathBuf::from(dir)),
            _ => Self::Identity,
        }
    }

    pub fn into_resolver(self) -> Box<dyn EnvironmentResolver> {
        match self {
            Self::Identity => Box::new(IdentityResolver),
            Self::SecretsDir(dir) => Box::new(SecretsDirResolver::new(dir)),
        }
    }
}

/// Snapshot the process environment and run it through `resolver`.
pub async fn resolve_environment(
    resolver: &dyn EnvironmentResolver,
) -> Result<ResolvedConfiguration, ConfigError> {
    let raw = RawEnvironment::capture();
    let resolved = resolver.resolve(raw).await?;
    debug!(
        strategy = resolver.name(),
        entries = resolved.len(),
        "Environment resolved"
    );
    Ok(resolved)
}
