//! Server settings.
//!
//! Settings are a typed view over the [`ResolvedConfiguration`], layered on
//! top of an optional `subgraph.toml` file:
//!
//! ```toml
//! port = 3000
//! body_limit = "100kb"
//! apollo_playground = "true"
//! ```
//!
//! | Name                   | Default      |
//! |------------------------|--------------|
//! | `PORT`                 | `3000`       |
//! | `BODY_LIMIT`           | `100kb`      |
//! | `APOLLO_INTROSPECTION` | `true`       |
//! | `APOLLO_PLAYGROUND`    | `false`      |
//! | `APOLLO_DEBUG`         | `false`      |
//! | `SCHEMA_PATH`          | `schema.graphql` next to the executable |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use subgraph_config::{ConfigError, ResolvedConfiguration};
use subgraph_graphql::GraphQLConfig;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BODY_LIMIT: &str = "100kb";
pub const DEFAULT_SETTINGS_FILE: &str = "subgraph.toml";
pub const SCHEMA_ARTIFACT: &str = "schema.graphql";

const SETTING_NAMES: [&str; 6] = [
    "PORT",
    "BODY_LIMIT",
    "APOLLO_INTROSPECTION",
    "APOLLO_PLAYGROUND",
    "APOLLO_DEBUG",
    "SCHEMA_PATH",
];

/// Typed server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub port: u16,
    /// Maximum request body size in bytes.
    pub body_limit: usize,
    pub introspection: bool,
    pub playground: bool,
    pub debug: bool,
    pub schema_path: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            body_limit: 100 * 1024,
            introspection: true,
            playground: false,
            debug: false,
            schema_path: None,
        }
    }
}

/// Raw string values, keyed by lower-cased name.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    port: Option<String>,
    body_limit: Option<String>,
    apollo_introspection: Option<String>,
    apollo_playground: Option<String>,
    apollo_debug: Option<String>,
    schema_path: Option<String>,
}

impl ServerSettings {
    /// Builds settings from the resolved configuration, with values from
    /// `file` underneath when it exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for unreadable sources and
    /// [`ConfigError::Validation`] for out-of-range values.
    pub fn load(resolved: &ResolvedConfiguration, file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = file.filter(|p| p.exists()) {
            builder = builder.add_source(File::from(path.to_path_buf()));
        }

        let values: HashMap<String, String> = SETTING_NAMES
            .into_iter()
            .filter_map(|name| resolved.get(name).map(|v| (name.to_ascii_lowercase(), v.to_string())))
            .collect();
        builder = builder.add_source(Environment::default().source(Some(values)));

        let raw: RawSettings = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| ConfigError::parse(format!("server settings: {e}")))?;

        Self::from_raw(raw)
    }

    /// Settings from the resolved configuration alone.
    pub fn from_resolved(resolved: &ResolvedConfiguration) -> Result<Self, ConfigError> {
        Self::load(resolved, None)
    }

    fn from_raw(raw: RawSettings) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match non_empty(raw.port.as_deref()) {
            Some(port) => port
                .parse::<u16>()
                .map_err(|e| ConfigError::validation(format!("PORT {port:?}: {e}")))?,
            None => defaults.port,
        };
        let body_limit = parse_body_limit(non_empty(raw.body_limit.as_deref()).unwrap_or(DEFAULT_BODY_LIMIT))?;

        Ok(Self {
            port,
            body_limit,
            introspection: parse_toggle(raw.apollo_introspection.as_deref(), defaults.introspection),
            playground: parse_toggle(raw.apollo_playground.as_deref(), defaults.playground),
            debug: parse_toggle(raw.apollo_debug.as_deref(), defaults.debug),
            schema_path: non_empty(raw.schema_path.as_deref()).map(PathBuf::from),
        })
    }

    pub fn graphql_config(&self) -> GraphQLConfig {
        GraphQLConfig {
            introspection: self.introspection,
            playground: self.playground,
            debug: self.debug,
            ..Default::default()
        }
    }

    /// Where the schema artifact is written.
    pub fn schema_artifact_path(&self) -> PathBuf {
        if let Some(path) = &self.schema_path {
            return path.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(SCHEMA_ARTIFACT)))
            .unwrap_or_else(|| PathBuf::from(SCHEMA_ARTIFACT))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A set toggle is on only when it is exactly `true`; unset keeps the default.
pub fn parse_toggle(value: Option<&str>, default: bool) -> bool {
    match non_empty(value) {
        Some(value) => value == "true",
        None => default,
    }
}

/// Parses `1048576`, `100kb`, `1mb` or `1gb` into bytes.
pub fn parse_body_limit(value: &str) -> Result<usize, ConfigError> {
    let lower = value.trim().to_ascii_lowercase();
    let (number, multiplier) = [("gb", 1usize << 30), ("mb", 1 << 20), ("kb", 1 << 10), ("b", 1)]
        .into_iter()
        .find_map(|(suffix, multiplier)| lower.strip_suffix(suffix).map(|n| (n.trim(), multiplier)))
        .unwrap_or((lower.as_str(), 1));

    number
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::validation(format!("BODY_LIMIT {value:?} is not a valid size")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(pairs: &[(&str, &str)]) -> ResolvedConfiguration {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults() {
        let settings = ServerSettings::from_resolved(&resolved(&[])).unwrap();
        assert_eq!(settings, ServerSettings::default());
        assert_eq!(settings.body_limit, 102_400);
    }

    #[test]
    fn test_values_from_environment() {
        let settings = ServerSettings::from_resolved(&resolved(&[
            ("PORT", "8082"),
            ("BODY_LIMIT", "2mb"),
            ("APOLLO_INTROSPECTION", "false"),
            ("APOLLO_PLAYGROUND", "true"),
            ("APOLLO_DEBUG", "yes"),
            ("SCHEMA_PATH", "/tmp/schema.graphql"),
        ]))
        .unwrap();

        assert_eq!(settings.port, 8082);
        assert_eq!(settings.body_limit, 2 * 1024 * 1024);
        assert!(!settings.introspection);
        assert!(settings.playground);
        assert!(!settings.debug);
        assert_eq!(settings.schema_artifact_path(), PathBuf::from("/tmp/schema.graphql"));
    }

    #[test]
    fn test_toggle_semantics() {
        assert!(parse_toggle(None, true));
        assert!(parse_toggle(Some(""), true));
        assert!(!parse_toggle(Some("TRUE"), true));
        assert!(!parse_toggle(Some("1"), false));
        assert!(parse_toggle(Some("true"), false));
    }

    #[test]
    fn test_body_limit_parsing() {
        assert_eq!(parse_body_limit("100kb").unwrap(), 102_400);
        assert_eq!(parse_body_limit("1MB").unwrap(), 1_048_576);
        assert_eq!(parse_body_limit("1gb").unwrap(), 1 << 30);
        assert_eq!(parse_body_limit("512").unwrap(), 512);
        assert_eq!(parse_body_limit("64b").unwrap(), 64);
        assert!(parse_body_limit("lots").is_err());
        assert!(parse_body_limit("0").is_err());
    }

    #[test]
    fn test_invalid_port() {
        let err = ServerSettings::from_resolved(&resolved(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_file_is_layered_under_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subgraph.toml");
        std::fs::write(&path, "port = 4000\nbody_limit = \"1mb\"\napollo_playground = true\n").unwrap();

        let settings = ServerSettings::load(&resolved(&[("PORT", "5000")]), Some(&path)).unwrap();
        assert_eq!(settings.port, 5000);
        assert_eq!(settings.body_limit, 1 << 20);
        assert!(settings.playground);
    }

    #[test]
    fn test_graphql_config() {
        let settings = ServerSettings {
            playground: true,
            ..Default::default()
        };
        let config = settings.graphql_config();
        assert_eq!(config.path, "/graphql");
        assert!(config.playground);
        assert!(config.introspection);
    }
}
