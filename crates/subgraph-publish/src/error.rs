//! Non-fatal publish errors.
//!
//! Nothing here ever aborts the process: every error is folded into a
//! [`crate::PublishOutcome`] and logged.

use std::fmt;

/// Required publish settings that were absent or empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing required configuration: {}", fields.join(", "))]
pub struct ConfigMissing {
    /// Configuration names, in the order they were checked.
    pub fields: Vec<String>,
}

/// Why publishing was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No registry key: an intentional skip, e.g. a local run.
    NoRegistryKey,
    MissingFields(ConfigMissing),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRegistryKey => f.write_str("no registry key configured"),
            Self::MissingFields(missing) => missing.fmt(f),
        }
    }
}

/// The registry CLI could not be run, or reported failure.
#[derive(Debug, thiserror::Error)]
pub enum ProcessExecutionError {
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process started, but piping its input or collecting its output failed.
    #[error("`{program}` failed while {stage}: {source}")]
    Io {
        program: String,
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("registry CLI exited with {}: {stderr}", code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}")))]
    NonZeroExit { code: Option<i32>, stderr: String },
}

impl ProcessExecutionError {
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    pub fn io(program: impl Into<String>, stage: &'static str, source: std::io::Error) -> Self {
        Self::Io {
            program: program.into(),
            stage,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_are_listed() {
        let reason = SkipReason::MissingFields(ConfigMissing {
            fields: vec!["APOLLO_GRAPH_REF".into(), "OPENFAAS_SERVICE_NAME".into()],
        });
        assert_eq!(
            reason.to_string(),
            "missing required configuration: APOLLO_GRAPH_REF, OPENFAAS_SERVICE_NAME"
        );
    }

    #[test]
    fn test_non_zero_exit_message() {
        let err = ProcessExecutionError::NonZeroExit {
            code: Some(1),
            stderr: "invalid graph ref".into(),
        };
        assert_eq!(err.to_string(), "registry CLI exited with status 1: invalid graph ref");

        let err = ProcessExecutionError::NonZeroExit {
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("a signal"));
    }

    #[test]
    fn test_io_failure_names_the_stage() {
        let err = ProcessExecutionError::io(
            "rover",
            "writing the schema to stdin",
            std::io::Error::from(std::io::ErrorKind::BrokenPipe),
        );
        let message = err.to_string();
        assert!(message.starts_with("`rover` failed while writing the schema to stdin"));
        assert!(!message.contains("failed to run"));
    }
}
