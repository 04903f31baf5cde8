//! Per-request GraphQL context.
//!
//! A [`RequestContextProvider`] turns the incoming request headers into a
//! [`RequestContext`] that is attached to the GraphQL request and handed to
//! every resolver through [`crate::ResolverInput::context`].

use std::collections::HashMap;

use axum::http::HeaderMap;

/// String values made available to resolvers for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    values: HashMap<String, String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Builds the context for each request.
pub trait RequestContextProvider: Send + Sync {
    fn provide(&self, headers: &HeaderMap) -> RequestContext;
}

/// Copies selected request headers into the context, keyed by lower-cased
/// header name.
#[derive(Debug, Clone)]
pub struct HeaderContextProvider {
    headers: Vec<String>,
}

impl HeaderContextProvider {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|h| h.into().to_ascii_lowercase())
                .collect(),
        }
    }
}

impl RequestContextProvider for HeaderContextProvider {
    fn provide(&self, headers: &HeaderMap) -> RequestContext {
        let mut ctx = RequestContext::new();
        for name in &self.headers {
            if let Some(value) = headers.get(name.as_str()).and_then(|v| v.to_str().ok()) {
                ctx.insert(name.clone(), value);
            }
        }
        ctx
    }
}
