//! Startup schema publishing for the subgraph service.
//!
//! After the HTTP listener is live, the service reads its own schema back
//! through introspection and publishes it to the Apollo registry with the
//! `rover` CLI. Publishing is best-effort: every outcome, including a skip, is
//! logged and nothing is propagated to the caller.
//!
//! ## Configuration
//!
//! | Name                      | Purpose                                         |
//! |---------------------------|-------------------------------------------------|
//! | `APOLLO_KEY`              | Registry key; publishing is skipped without it   |
//! | `APOLLO_GRAPH_REF`        | `graph@variant` target                           |
//! | `APOLLO_GRAPH_ID`, `APOLLO_GRAPH_VARIANT`, `APOLLO_SUPERGRAPH_NAME` | Legacy target, used when no graph ref is set |
//! | `OPENFAAS_SERVICE_NAME`   | Subgraph name                                    |
//! | `OPENFAAS_FUNCTION_NAME`  | Gateway route for the default routing URL        |
//! | `APOLLO_ROUTING_URL`      | Explicit routing URL                             |

pub mod command;
pub mod error;
pub mod publisher;
pub mod runner;

// Re-export main types
pub use command::{GraphTarget, PublishCommand};
pub use error::{ConfigMissing, ProcessExecutionError, SkipReason};
pub use publisher::{PublishOutcome, PublisherSettings, SchemaPublisher};
pub use runner::{ProcessOutput, PublishRunner, RecordingRunner, RoverCli};
