//! Publish command construction.
//!
//! Validation reads the resolved configuration once and either yields a
//! complete [`PublishCommand`] or the exact list of names that are missing.

use std::fmt;

use subgraph_config::ResolvedConfiguration;
use tracing::warn;

use crate::error::{ConfigMissing, SkipReason};

pub const APOLLO_KEY: &str = "APOLLO_KEY";
pub const APOLLO_GRAPH_REF: &str = "APOLLO_GRAPH_REF";
pub const APOLLO_GRAPH_ID: &str = "APOLLO_GRAPH_ID";
pub const APOLLO_GRAPH_VARIANT: &str = "APOLLO_GRAPH_VARIANT";
pub const APOLLO_SUPERGRAPH_NAME: &str = "APOLLO_SUPERGRAPH_NAME";
pub const APOLLO_ROUTING_URL: &str = "APOLLO_ROUTING_URL";
pub const OPENFAAS_SERVICE_NAME: &str = "OPENFAAS_SERVICE_NAME";
pub const OPENFAAS_FUNCTION_NAME: &str = "OPENFAAS_FUNCTION_NAME";

/// Gateway address functions are reachable through.
pub const DEFAULT_GATEWAY_URL: &str = "http://gateway.openfaas:8080";

const LEGACY_GRAPH_FIELDS: [&str; 3] = [APOLLO_GRAPH_ID, APOLLO_GRAPH_VARIANT, APOLLO_SUPERGRAPH_NAME];

/// Where the subgraph is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphTarget {
    /// `graph@variant` taken verbatim from `APOLLO_GRAPH_REF`.
    GraphRef(String),

    /// Older deployments name the graph, variant and supergraph separately.
    Legacy {
        graph_id: String,
        variant: String,
        supergraph: String,
    },
}

impl GraphTarget {
    /// The `graph@variant` reference passed to the registry CLI.
    pub fn graph_ref(&self) -> String {
        match self {
            Self::GraphRef(graph_ref) => graph_ref.clone(),
            Self::Legacy {
                graph_id, variant, ..
            } => format!("{graph_id}@{variant}"),
        }
    }

    /// Resolves the target; `APOLLO_GRAPH_REF` takes precedence over the
    /// legacy fields.
    ///
    /// # Errors
    ///
    /// Returns the missing names when neither form is complete. With no
    /// legacy field set at all, only `APOLLO_GRAPH_REF` is reported.
    pub fn from_config(config: &ResolvedConfiguration) -> Result<Self, Vec<String>> {
        let legacy_present: Vec<&str> = LEGACY_GRAPH_FIELDS
            .into_iter()
            .filter(|name| config.get_non_empty(name).is_some())
            .collect();

        if let Some(graph_ref) = config.get_non_empty(APOLLO_GRAPH_REF) {
            if !legacy_present.is_empty() {
                warn!(
                    ignored = ?legacy_present,
                    "APOLLO_GRAPH_REF is set, ignoring legacy graph fields"
                );
            }
            return Ok(Self::GraphRef(graph_ref.to_string()));
        }

        match (
            config.get_non_empty(APOLLO_GRAPH_ID),
            config.get_non_empty(APOLLO_GRAPH_VARIANT),
            config.get_non_empty(APOLLO_SUPERGRAPH_NAME),
        ) {
            (Some(graph_id), Some(variant), Some(supergraph)) => Ok(Self::Legacy {
                graph_id: graph_id.to_string(),
                variant: variant.to_string(),
                supergraph: supergraph.to_string(),
            }),
            _ if legacy_present.is_empty() => Err(vec![APOLLO_GRAPH_REF.to_string()]),
            _ => Err(LEGACY_GRAPH_FIELDS
                .into_iter()
                .filter(|name| !legacy_present.contains(name))
                .map(str::to_string)
                .collect()),
        }
    }
}

impl fmt::Display for GraphTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GraphRef(graph_ref) => f.write_str(graph_ref),
            Self::Legacy {
                graph_id,
                variant,
                supergraph,
            } => write!(f, "{graph_id}@{variant} (supergraph {supergraph})"),
        }
    }
}

/// A fully validated request to publish the subgraph schema.
#[derive(Clone, PartialEq, Eq)]
pub struct PublishCommand {
    pub registry_key: String,
    pub target: GraphTarget,
    pub subgraph_name: String,
    pub routing_url: String,
    /// Local endpoint the served schema is read back from.
    pub introspection_endpoint: String,
}

impl PublishCommand {
    /// Builds the command from resolved configuration.
    ///
    /// # Errors
    ///
    /// [`SkipReason::NoRegistryKey`] without `APOLLO_KEY`, otherwise
    /// [`SkipReason::MissingFields`] naming every absent setting.
    pub fn from_config(
        config: &ResolvedConfiguration,
        introspection_endpoint: &str,
    ) -> Result<Self, SkipReason> {
        let registry_key = config
            .get_non_empty(APOLLO_KEY)
            .ok_or(SkipReason::NoRegistryKey)?;

        let mut missing = Vec::new();
        let target = GraphTarget::from_config(config)
            .map_err(|fields| missing.extend(fields))
            .ok();
        let service = config.get_non_empty(OPENFAAS_SERVICE_NAME);
        if service.is_none() {
            missing.push(OPENFAAS_SERVICE_NAME.to_string());
        }

        let (Some(target), Some(service)) = (target, service) else {
            return Err(SkipReason::MissingFields(ConfigMissing { fields: missing }));
        };

        let routing_url = match config.get_non_empty(APOLLO_ROUTING_URL) {
            Some(url) => url.to_string(),
            None => {
                let function = config.get_non_empty(OPENFAAS_FUNCTION_NAME).unwrap_or(service);
                default_routing_url(function)
            }
        };

        Ok(Self {
            registry_key: registry_key.to_string(),
            target,
            subgraph_name: service.to_string(),
            routing_url,
            introspection_endpoint: introspection_endpoint.to_string(),
        })
    }

    pub fn graph_ref(&self) -> String {
        self.target.graph_ref()
    }
}

// Keeps the registry key out of logs.
impl fmt::Debug for PublishCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishCommand")
            .field("registry_key", &"***")
            .field("target", &self.target)
            .field("subgraph_name", &self.subgraph_name)
            .field("routing_url", &self.routing_url)
            .field("introspection_endpoint", &self.introspection_endpoint)
            .finish()
    }
}

/// Gateway route of an OpenFaaS function.
pub fn default_routing_url(function: &str) -> String {
    format!("{DEFAULT_GATEWAY_URL}/function/{function}")
}

/// Introspection endpoint of the service listening on `port`.
pub fn local_introspection_endpoint(port: u16) -> String {
    format!("http://localhost:{port}/graphql")
}
