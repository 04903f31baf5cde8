//! # subgraph-graphql
//!
//! Schema assembly and federation for a GraphQL subgraph.
//!
//! Types and resolvers are declared through an explicit builder API, compiled
//! into a base executable schema, then re-derived as an Apollo Federation
//! subgraph schema with entity keys, reference resolvers and orphaned types.
//!
//! ## Pipeline
//!
//! 1. [`SchemaCompiler`] validates [`TypeDefinition`]s against a
//!    [`ResolverRegistry`] and builds the base [`BaseSchema`]
//! 2. [`FederationAugmenter`] prints the base schema, re-parses the SDL,
//!    merges the [`DirectiveSet`] and rebuilds it as a [`FederatedSchema`]
//! 3. [`handler`] serves the result over axum
//!
//! ## Configuration
//!
//! ```toml
//! path = "/graphql"
//! introspection = true
//! playground = false
//! debug = false
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Type and field declarations
//! - [`resolver`] - Resolver registration
//! - [`directives`] - Directive definitions and merging
//! - [`compiler`] - Base schema compilation
//! - [`federation`] - Federation augmentation
//! - [`context`] - Per-request context
//! - [`handler`] - Axum HTTP handlers
//! - [`error`] - Schema build errors

pub mod compiler;
pub mod config;
pub mod context;
pub mod directives;
pub mod error;
pub mod federation;
pub mod handler;
pub mod resolver;
pub mod types;

// Re-export main types
pub use compiler::{BaseSchema, SchemaCompiler, SchemaOptions};
pub use config::GraphQLConfig;
pub use context::{HeaderContextProvider, RequestContext, RequestContextProvider};
pub use directives::{DirectiveDefinition, DirectiveLocation, DirectiveOrigin, DirectiveSet};
pub use error::SchemaBuildError;
pub use federation::{FederatedSchema, FederationAugmenter, KeySelection};
pub use handler::{GraphQLState, graphql_router};
pub use resolver::{
    ReferenceResolvers, ResolverError, ResolverInput, ResolverRegistry, ResolverResult,
};
pub use types::{ArgumentDefinition, FieldDefinition, FieldType, TypeDefinition, TypeKind};

/// Root operation type names.
pub const QUERY_TYPE: &str = "Query";
pub const MUTATION_TYPE: &str = "Mutation";
