//! Resolver registration.
//!
//! Resolvers work on `serde_json::Value`s; conversion to and from engine
//! values happens at the binding layer in [`crate::compiler`].

use std::future::Future;
use std::sync::Arc;

use async_graphql::dynamic::ResolverContext;
use async_graphql::Value;
use futures_util::future::BoxFuture;
use indexmap::IndexMap;

use crate::context::RequestContext;
use crate::{MUTATION_TYPE, QUERY_TYPE};

/// Error returned by a resolver; surfaces as a GraphQL error for the field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ResolverError {
    message: String,
}

impl ResolverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for ResolverError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ResolverError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Outcome of a resolver: `Ok(None)` resolves to `null`.
pub type ResolverResult = Result<Option<serde_json::Value>, ResolverError>;

/// Everything a field resolver can see.
#[derive(Debug, Clone, Default)]
pub struct ResolverInput {
    /// Value of the parent object, `None` on root fields.
    pub parent: Option<serde_json::Value>,
    pub arguments: serde_json::Map<String, serde_json::Value>,
    pub context: Option<RequestContext>,
}

impl ResolverInput {
    /// String argument by name.
    pub fn str_arg(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).and_then(serde_json::Value::as_str)
    }

    pub(crate) fn from_context(ctx: &ResolverContext<'_>) -> async_graphql::Result<Self> {
        let parent = match ctx.parent_value.as_value() {
            Some(Value::Null) | None => None,
            Some(value) => Some(value.clone().into_json()?),
        };

        let mut arguments = serde_json::Map::new();
        for (name, value) in ctx.args.iter() {
            arguments.insert(name.to_string(), value.as_value().clone().into_json()?);
        }

        Ok(Self {
            parent,
            arguments,
            context: ctx.data_opt::<RequestContext>().cloned(),
        })
    }
}

pub(crate) type ResolverFn = Arc<dyn Fn(ResolverInput) -> BoxFuture<'static, ResolverResult> + Send + Sync>;

/// Resolver bindings keyed by `(type, field)`.
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    entries: IndexMap<(String, String), ResolverFn>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `resolver` to `type_name.field`, replacing any earlier binding.
    pub fn register<F, Fut>(
        &mut self,
        type_name: impl Into<String>,
        field: impl Into<String>,
        resolver: F,
    ) -> &mut Self
    where
        F: Fn(ResolverInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        let resolver: ResolverFn = Arc::new(move |input| Box::pin(resolver(input)));
        self.entries
            .insert((type_name.into(), field.into()), resolver);
        self
    }

    /// Binds a `Query` operation.
    pub fn query<F, Fut>(&mut self, field: impl Into<String>, resolver: F) -> &mut Self
    where
        F: Fn(ResolverInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        self.register(QUERY_TYPE, field, resolver)
    }

    /// Binds a `Mutation` operation.
    pub fn mutation<F, Fut>(&mut self, field: impl Into<String>, resolver: F) -> &mut Self
    where
        F: Fn(ResolverInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        self.register(MUTATION_TYPE, field, resolver)
    }

    pub(crate) fn get(&self, type_name: &str, field: &str) -> Option<&ResolverFn> {
        self.entries
            .get(&(type_name.to_string(), field.to_string()))
    }

    pub fn contains(&self, type_name: &str, field: &str) -> bool {
        self.get(type_name, field).is_some()
    }

    /// Registered `(type, field)` pairs in registration order.
    pub fn targets(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .keys()
            .map(|(t, f)| (t.as_str(), f.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.targets().map(|(t, field)| format!("{t}.{field}")))
            .finish()
    }
}

pub(crate) type ReferenceResolverFn =
    Arc<dyn Fn(serde_json::Value) -> BoxFuture<'static, ResolverResult> + Send + Sync>;

/// Entity reference resolvers keyed by type name.
///
/// Each resolver receives an object holding exactly the entity's key fields
/// and returns the full entity, or `None` when it does not exist.
#[derive(Clone, Default)]
pub struct ReferenceResolvers {
    entries: IndexMap<String, ReferenceResolverFn>,
}

impl ReferenceResolvers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(&mut self, type_name: impl Into<String>, resolver: F) -> &mut Self
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        let resolver: ReferenceResolverFn = Arc::new(move |reference| Box::pin(resolver(reference)));
        self.entries.insert(type_name.into(), resolver);
        self
    }

    pub(crate) fn get(&self, type_name: &str) -> Option<&ReferenceResolverFn> {
        self.entries.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ReferenceResolvers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.type_names()).finish()
    }
}

/// Convert a serde_json::Value to async_graphql::Value.
pub(crate) fn json_to_graphql_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else if let Some(f) = n.as_f64() {
                Value::Number(
                    async_graphql::Number::from_f64(f).unwrap_or_else(|| async_graphql::Number::from(0)),
                )
            } else {
                Value::Null
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => {
            Value::List(arr.into_iter().map(json_to_graphql_value).collect())
        }
        serde_json::Value::Object(obj) => {
            let map: async_graphql::indexmap::IndexMap<async_graphql::Name, Value> = obj
                .into_iter()
                .map(|(k, v)| (async_graphql::Name::new(k), json_to_graphql_value(v)))
                .collect();
            Value::Object(map)
        }
    }
}
