//! Startup configuration resolution for the subgraph service
//!
//! Deployments hand configuration to a function in different ways: plain
//! environment variables, mounted secret files, or a fetch step against an
//! external store. This crate hides that behind one operation that produces a
//! flat, immutable [`ResolvedConfiguration`]:
//!
//! ```text
//!   std::env::vars() ──► RawEnvironment ──► EnvironmentResolver ──► ResolvedConfiguration
//!                                            │
//!                        ┌───────────────────┼───────────────────┐
//!                        ▼                   ▼                   ▼
//!                 IdentityResolver   SecretsDirResolver     HookResolver
//! ```
//!
//! The resolved value is computed once at startup and shared read-only by the
//! HTTP bootstrap and the schema publisher.

pub mod resolved;
pub mod sources;

// Re-export main types
pub use resolved::{RawEnvironment, Redacted, ResolvedConfiguration};
pub use sources::{
    EnvironmentResolver, HookResolver, IdentityResolver, ResolverStrategy, SecretsDirResolver,
    resolve_environment,
};

/// Error types for configuration resolution
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Source error: {source}")]
    Source {
        source_name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ConfigError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn source(
        source_name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Source {
            source_name: source_name.into(),
            source: source.into(),
        }
    }
}
