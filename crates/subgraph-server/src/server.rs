use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{Json, Router};
use subgraph_config::ResolvedConfiguration;
use subgraph_graphql::{
    FederatedSchema, FederationAugmenter, GraphQLState, RequestContextProvider, SchemaBuildError,
    SchemaCompiler, graphql_router,
};
use subgraph_publish::SchemaPublisher;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::ServerSettings;
use crate::function::FunctionDefinition;

/// Compiles the function's declarations and federates the result.
pub fn build_schema(
    function: FunctionDefinition,
    settings: &ServerSettings,
) -> Result<FederatedSchema, SchemaBuildError> {
    let FunctionDefinition {
        types,
        resolvers,
        directives,
        orphans,
        references,
    } = function;

    let base = SchemaCompiler::new(settings.graphql_config().to_schema_options())
        .compile(types, resolvers)?;

    FederationAugmenter::new()
        .directives(directives)
        .orphans(orphans)
        .reference_resolvers(references)
        .augment(&base)
}

pub fn build_app(
    schema: &FederatedSchema,
    settings: &ServerSettings,
    context_provider: Option<Arc<dyn RequestContextProvider>>,
) -> Router {
    let mut state = GraphQLState::new(schema.schema().clone(), settings.graphql_config());
    if let Some(provider) = context_provider {
        state = state.with_context_provider(provider);
    }

    graphql_router(state)
        .route("/healthz", get(healthz))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        span.record("http.status_code", tracing::field::display(res.status().as_u16()));
                        tracing::debug!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(DefaultBodyLimit::max(settings.body_limit))
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Publish step started once the listener is live.
pub struct PublishTask {
    pub publisher: SchemaPublisher,
    pub config: Arc<ResolvedConfiguration>,
}

pub struct SubgraphServer {
    addr: SocketAddr,
    listener: TcpListener,
    app: Router,
}

impl SubgraphServer {
    /// Binds the listener; connections queue until [`Self::run`].
    pub async fn bind(addr: SocketAddr, app: Router) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        Ok(Self { addr, listener, app })
    }

    /// Binds all interfaces on `port`.
    pub async fn bind_port(port: u16, app: Router) -> anyhow::Result<Self> {
        Self::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)), app).await
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serves until `shutdown` completes. The publish task is spawned after
    /// the listener is bound and never affects serving.
    pub async fn run<F>(self, publish: Option<PublishTask>, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("OpenFaaS GraphQL listening on {}", self.addr);

        if let Some(PublishTask { publisher, config }) = publish {
            // Outcome is logged by the publisher.
            drop(publisher.spawn(config));
        }

        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

pub async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
