//! GraphQL endpoint configuration.
//!
//! # Example Configuration
//!
//! ```toml
//! path = "/graphql"
//! introspection = true
//! playground = false
//! debug = false
//! ```

use serde::{Deserialize, Serialize};

use crate::compiler::SchemaOptions;

/// GraphQL endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQLConfig {
    /// Path the endpoint is mounted at.
    /// Default: "/graphql"
    #[serde(default = "default_path")]
    pub path: String,

    /// Enable GraphQL introspection queries.
    /// The registry publish step reads the schema back through introspection.
    /// Default: true
    #[serde(default = "default_introspection")]
    pub introspection: bool,

    /// Serve the interactive playground on `GET` requests without a query.
    /// Default: false
    #[serde(default)]
    pub playground: bool,

    /// Log every operation with its variables and errors.
    /// Default: false
    #[serde(default)]
    pub debug: bool,
}

fn default_path() -> String {
    "/graphql".to_string()
}

fn default_introspection() -> bool {
    true
}

impl Default for GraphQLConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            introspection: default_introspection(),
            playground: false,
            debug: false,
        }
    }
}

impl GraphQLConfig {
    #[must_use]
    pub fn to_schema_options(&self) -> SchemaOptions {
        SchemaOptions {
            introspection: self.introspection,
            debug: self.debug,
        }
    }
}
