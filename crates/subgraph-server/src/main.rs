use std::path::Path;
use std::sync::Arc;

use subgraph_config::{RawEnvironment, ResolverStrategy, resolve_environment};
use subgraph_graphql::HeaderContextProvider;
use subgraph_publish::{PublisherSettings, RoverCli, SchemaPublisher};
use subgraph_server::config::DEFAULT_SETTINGS_FILE;
use subgraph_server::observability::LogFilter;
use subgraph_server::{PublishTask, ServerSettings, SubgraphServer, build_app, build_schema, function};

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist - it's optional
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    let log_filter = subgraph_server::observability::init_tracing();

    if let Err(e) = run(log_filter).await {
        tracing::error!(error = %e, "Subgraph startup failed");
        std::process::exit(1);
    }
}

async fn run(log_filter: LogFilter) -> anyhow::Result<()> {
    let resolver = ResolverStrategy::from_env(&RawEnvironment::capture()).into_resolver();
    let resolved = Arc::new(resolve_environment(resolver.as_ref()).await?);

    let settings = ServerSettings::load(&resolved, Some(Path::new(DEFAULT_SETTINGS_FILE)))?;
    log_filter.apply_debug_toggle(settings.debug);

    let schema = build_schema(function::definition(), &settings)
        .inspect_err(|e| tracing::error!(code = e.error_code(), "Schema build failed"))?;

    let artifact = settings.schema_artifact_path();
    match schema.write_sdl(&artifact).await {
        Ok(()) => tracing::info!(path = %artifact.display(), "Schema definition written"),
        Err(e) => tracing::warn!(path = %artifact.display(), error = %e, "Could not write schema definition"),
    }

    let context = Arc::new(HeaderContextProvider::new(["authorization", "x-request-id"]));
    let app = build_app(&schema, &settings, Some(context));
    let server = SubgraphServer::bind_port(settings.port, app).await?;

    let publisher = SchemaPublisher::new(
        Arc::new(RoverCli::default()),
        PublisherSettings::for_port(server.local_addr().port()),
    );
    let publish = PublishTask {
        publisher,
        config: resolved,
    };

    server
        .run(Some(publish), subgraph_server::shutdown_signal())
        .await
}
