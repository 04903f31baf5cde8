//! HTTP bootstrap for the federated GraphQL subgraph function.
//!
//! Startup order:
//!
//! 1. resolve the environment once ([`subgraph_config`])
//! 2. compile and federate the function's schema; failure is fatal
//! 3. write the SDL artifact
//! 4. bind the listener, then start publishing in the background
//! 5. serve until Ctrl-C

pub mod config;
pub mod function;
pub mod observability;
pub mod server;

pub use config::ServerSettings;
pub use server::{PublishTask, SubgraphServer, build_app, build_schema, shutdown_signal};
