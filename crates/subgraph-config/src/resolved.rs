//! Resolved configuration values
//!
//! [`RawEnvironment`] is the unprocessed input handed to a resolver strategy;
//! [`ResolvedConfiguration`] is the flattened, immutable result every other
//! component reads from.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Name fragments whose values are masked in diagnostic dumps
const SENSITIVE_MARKERS: [&str; 4] = ["KEY", "SECRET", "TOKEN", "PASSWORD"];

/// Snapshot of the process environment before any strategy has run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEnvironment {
    vars: HashMap<String, String>,
}

impl RawEnvironment {
    /// Snapshot the current process environment.
    ///
    /// Variables whose name or value is not valid unicode are skipped.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn into_vars(self) -> HashMap<String, String> {
        self.vars
    }
}

impl<K, V> FromIterator<(K, V)> for RawEnvironment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, String>> for RawEnvironment {
    fn from(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }
}

/// Flattened configuration produced once at startup.
///
/// There is no mutation API: once built the mapping is only read, and it is
/// shared behind an `Arc` between the server bootstrap and the publisher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfiguration {
    values: BTreeMap<String, String>,
}

impl ResolvedConfiguration {
    pub fn new(values: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Value for `name`, if present (possibly empty).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Value for `name` with surrounding whitespace removed, treating an empty
    /// value the same as an absent one.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_non_empty(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Display adapter listing every entry with sensitive values masked.
    pub fn redacted(&self) -> Redacted<'_> {
        Redacted(self)
    }
}

impl<K, V> FromIterator<(K, V)> for ResolvedConfiguration
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())))
    }
}

/// Diagnostic rendering of a [`ResolvedConfiguration`]
pub struct Redacted<'a>(&'a ResolvedConfiguration);

impl fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if is_sensitive(name) && !value.is_empty() {
                write!(f, "{name}=***")?;
            } else {
                write!(f, "{name}={value:?}")?;
            }
        }
        f.write_str("}")
    }
}

fn is_sensitive(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    SENSITIVE_MARKERS.iter().any(|m| upper.contains(m))
}
