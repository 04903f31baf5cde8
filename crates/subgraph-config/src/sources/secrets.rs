//! Mounted secrets directory strategy
//!
//! Function platforms such as OpenFaaS mount secrets as one file per secret
//! (`/var/openfaas/secrets/apollo-key`). Each file becomes a configuration
//! entry whose name is the file name upper-cased with `-` and `.` mapped to
//! `_`, so `apollo-key` lands as `APOLLO_KEY`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::resolved::{RawEnvironment, ResolvedConfiguration};
use crate::sources::EnvironmentResolver;
use crate::ConfigError;

/// Default mount point for OpenFaaS secrets
pub const DEFAULT_SECRETS_DIR: &str = "/var/openfaas/secrets";

/// Layers secret files over the raw environment.
///
/// Secret values take precedence over environment variables of the same name.
/// A missing directory is not an error: the environment is used as-is.
#[derive(Debug, Clone)]
pub struct SecretsDirResolver {
    dir: PathBuf,
}

impl SecretsDirResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_secrets(&self) -> Result<HashMap<String, String>, ConfigError> {
        let mut secrets = HashMap::new();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(dir = %self.dir.display(), "Secrets directory does not exist");
                return Ok(secrets);
            }
            Err(e) => return Err(ConfigError::source(self.dir.display().to_string(), e)),
        };

        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if !file_type.is_file() && !file_type.is_symlink() {
                continue;
            }

            let Some(file_name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            // Kubernetes projects secrets through hidden `..data` links
            if file_name.starts_with('.') {
                continue;
            }

            let contents = match tokio::fs::read_to_string(entry.path()).await {
                Ok(contents) => contents,
                // Dangling or directory symlinks
                Err(e) if file_type.is_symlink() => {
                    debug!(file = %file_name, error = %e, "Skipping unreadable secret link");
                    continue;
                }
                Err(e) => return Err(ConfigError::source(file_name, e)),
            };

            secrets.insert(secret_name(&file_name), contents.trim().to_string());
        }

        Ok(secrets)
    }
}

#[async_trait]
impl EnvironmentResolver for SecretsDirResolver {
    fn name(&self) -> &str {
        "secrets-dir"
    }

    async fn resolve(&self, raw: RawEnvironment) -> Result<ResolvedConfiguration, ConfigError> {
        let secrets = self.read_secrets().await?;
        debug!(
            dir = %self.dir.display(),
            count = secrets.len(),
            "Loaded mounted secrets"
        );

        let mut values = raw.into_vars();
        values.extend(secrets);
        Ok(ResolvedConfiguration::new(values))
    }
}

fn secret_name(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| match c {
            '-' | '.' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_name_mapping() {
        assert_eq!(secret_name("apollo-key"), "APOLLO_KEY");
        assert_eq!(secret_name("APOLLO_GRAPH_REF"), "APOLLO_GRAPH_REF");
        assert_eq!(secret_name("db.password"), "DB_PASSWORD");
    }

    #[tokio::test]
    async fn test_secrets_override_environment() {
        let dir = tempfile::tempdir().expect("tmp dir");
        std::fs::write(dir.path().join("apollo-key"), "service:secret\n").unwrap();
        std::fs::write(dir.path().join("..data"), "ignored").unwrap();

        let raw: RawEnvironment = [("APOLLO_KEY", "from-env"), ("PORT", "3000")]
            .into_iter()
            .collect();
        let resolved = SecretsDirResolver::new(dir.path()).resolve(raw).await.unwrap();

        assert_eq!(resolved.get("APOLLO_KEY"), Some("service:secret"));
        assert_eq!(resolved.get("PORT"), Some("3000"));
        assert_eq!(resolved.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_directory_falls_back_to_environment() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let resolver = SecretsDirResolver::new(dir.path().join("absent"));

        let raw: RawEnvironment = [("PORT", "3000")].into_iter().collect();
        let resolved = resolver.resolve(raw).await.unwrap();
        assert_eq!(resolved.get("PORT"), Some("3000"));
    }
}
