//! Engine hooks for the federation entry points.
//!
//! Two answers cannot be expressed through the dynamic schema alone: a
//! `null` item inside `_entities` and the caller directives inside
//! `_service { sdl }`. [`FederationExtension`] rewrites both at resolve time.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};

use async_graphql::extensions::{
    Extension, ExtensionContext, ExtensionFactory, NextPrepareRequest, NextResolve, ResolveInfo,
};
use async_graphql::{QueryPathSegment, Request, ServerResult, Value};

const ENTITIES_FIELD: &str = "_entities";
const SERVICE_TYPE: &str = "_Service";

/// Positions of `_entities` items whose reference resolver found nothing,
/// keyed by the field's response key. One set lives in each request.
#[derive(Debug, Default)]
pub(crate) struct MissingEntities(Mutex<HashSet<(String, usize)>>);

impl MissingEntities {
    pub(crate) fn insert(&self, response_key: &str, index: usize) {
        if let Ok(mut missing) = self.0.lock() {
            missing.insert((response_key.to_string(), index));
        }
    }

    fn contains(&self, response_key: &str, index: usize) -> bool {
        self.0
            .lock()
            .map(|missing| missing.contains(&(response_key.to_string(), index)))
            .unwrap_or(false)
    }
}

/// Registered on every schema that serves `_entities`.
pub(crate) struct FederationExtension {
    sdl: Arc<OnceLock<String>>,
}

impl FederationExtension {
    pub(crate) fn new(sdl: Arc<OnceLock<String>>) -> Self {
        Self { sdl }
    }
}

impl ExtensionFactory for FederationExtension {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(FederationExtensionImpl {
            sdl: self.sdl.clone(),
        })
    }
}

struct FederationExtensionImpl {
    sdl: Arc<OnceLock<String>>,
}

#[async_trait::async_trait]
impl Extension for FederationExtensionImpl {
    async fn prepare_request(
        &self,
        ctx: &ExtensionContext<'_>,
        mut request: Request,
        next: NextPrepareRequest<'_>,
    ) -> ServerResult<Request> {
        request.data.insert(MissingEntities::default());
        next.run(ctx, request).await
    }

    async fn resolve(
        &self,
        ctx: &ExtensionContext<'_>,
        info: ResolveInfo<'_>,
        next: NextResolve<'_>,
    ) -> ServerResult<Option<Value>> {
        if info.parent_type == SERVICE_TYPE
            && info.name == "sdl"
            && let Some(sdl) = self.sdl.get()
        {
            return Ok(Some(Value::String(sdl.clone())));
        }

        if info.name == ENTITIES_FIELD
            && let QueryPathSegment::Index(index) = info.path_node.segment
            && let Some(QueryPathSegment::Name(response_key)) = info.path_node.parent.map(|p| p.segment)
            && ctx
                .data_opt::<MissingEntities>()
                .is_some_and(|missing| missing.contains(response_key, index))
        {
            return Ok(Some(Value::Null));
        }

        next.run(ctx, info).await
    }
}
