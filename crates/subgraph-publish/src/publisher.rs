//! The publish state machine.
//!
//! ```text
//! Idle ─► KeyCheck ─┬─► [Skipped: no key]
//!                   └─► FieldValidation ─┬─► [Skipped: missing fields]
//!                                        └─► BuildCommand ─► Execute ─┬─► [Succeeded]
//!                                                                     └─► [Failed]
//! ```

use std::fmt;
use std::sync::Arc;

use subgraph_config::ResolvedConfiguration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::command::{PublishCommand, local_introspection_endpoint};
use crate::error::{ProcessExecutionError, SkipReason};
use crate::runner::PublishRunner;

/// Result of one publish attempt.
#[derive(Debug)]
pub enum PublishOutcome {
    Skipped(SkipReason),
    Failed(ProcessExecutionError),
    /// Registry CLI stdout.
    Succeeded(String),
}

impl PublishOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

impl fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
            Self::Failed(error) => write!(f, "failed: {error}"),
            Self::Succeeded(_) => f.write_str("succeeded"),
        }
    }
}

/// Settings not taken from the resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherSettings {
    pub introspection_endpoint: String,
}

impl PublisherSettings {
    /// Introspect the local service listening on `port`.
    pub fn for_port(port: u16) -> Self {
        Self {
            introspection_endpoint: local_introspection_endpoint(port),
        }
    }
}

/// Decides whether to publish and runs the registry command.
#[derive(Clone)]
pub struct SchemaPublisher {
    runner: Arc<dyn PublishRunner>,
    settings: PublisherSettings,
}

impl SchemaPublisher {
    pub fn new(runner: Arc<dyn PublishRunner>, settings: PublisherSettings) -> Self {
        Self { runner, settings }
    }

    /// Validates the configuration without running anything.
    ///
    /// # Errors
    ///
    /// Returns the reason publishing would be skipped.
    pub fn plan(&self, config: &ResolvedConfiguration) -> Result<PublishCommand, SkipReason> {
        PublishCommand::from_config(config, &self.settings.introspection_endpoint)
    }

    /// Runs the state machine once and logs the outcome.
    pub async fn publish(&self, config: &ResolvedConfiguration) -> PublishOutcome {
        let command = match self.plan(config) {
            Ok(command) => command,
            Err(reason) => {
                let outcome = PublishOutcome::Skipped(reason);
                log_outcome(&outcome, config);
                return outcome;
            }
        };

        info!(
            graph_ref = %command.target,
            subgraph = %command.subgraph_name,
            routing_url = %command.routing_url,
            "Publishing subgraph schema to registry"
        );

        let outcome = match self.runner.run(&command).await {
            Ok(output) if output.is_success() => PublishOutcome::Succeeded(output.stdout),
            Ok(output) => PublishOutcome::Failed(ProcessExecutionError::NonZeroExit {
                code: output.code,
                stderr: output.stderr,
            }),
            Err(e) => PublishOutcome::Failed(e),
        };
        log_outcome(&outcome, config);
        outcome
    }

    /// Publishes on a detached task.
    pub fn spawn(&self, config: Arc<ResolvedConfiguration>) -> JoinHandle<PublishOutcome> {
        let publisher = self.clone();
        tokio::spawn(async move { publisher.publish(&config).await })
    }
}

impl fmt::Debug for SchemaPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaPublisher")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn log_outcome(outcome: &PublishOutcome, config: &ResolvedConfiguration) {
    match outcome {
        PublishOutcome::Skipped(SkipReason::NoRegistryKey) => {
            info!(
                config = %config.redacted(),
                "No APOLLO_KEY configured, skipping schema publish"
            );
        }
        PublishOutcome::Skipped(SkipReason::MissingFields(missing)) => {
            warn!(missing = ?missing.fields, "Skipping schema publish: {missing}");
        }
        PublishOutcome::Failed(e) => {
            error!(error = %e, "Schema publish failed");
        }
        PublishOutcome::Succeeded(stdout) => {
            info!(output = %stdout.trim(), "Updated registry schema");
        }
    }
}
