//! Axum HTTP handlers for the GraphQL endpoint.
//!
//! - `POST {path}` - executes a JSON-encoded GraphQL request
//! - `GET {path}` - executes a query passed as URL parameters, or serves the
//!   playground when it is enabled and no query is given

use std::sync::Arc;

use async_graphql::dynamic::Schema;
use async_graphql::http::{GraphQLPlaygroundConfig, playground_source};
use async_graphql::{Request, Variables};
use async_graphql_axum::GraphQLResponse;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::debug;

use crate::config::GraphQLConfig;
use crate::context::RequestContextProvider;

/// State shared across GraphQL handlers.
#[derive(Clone)]
pub struct GraphQLState {
    pub schema: Schema,
    pub config: GraphQLConfig,

    /// Builds the per-request context handed to resolvers.
    pub context_provider: Option<Arc<dyn RequestContextProvider>>,
}

impl GraphQLState {
    pub fn new(schema: Schema, config: GraphQLConfig) -> Self {
        Self {
            schema,
            config,
            context_provider: None,
        }
    }

    #[must_use]
    pub fn with_context_provider(mut self, provider: Arc<dyn RequestContextProvider>) -> Self {
        self.context_provider = Some(provider);
        self
    }
}

/// GraphQL request body.
#[derive(Debug, Deserialize)]
pub struct GraphQLRequest {
    pub query: String,

    #[serde(rename = "operationName")]
    pub operation_name: Option<String>,

    pub variables: Option<serde_json::Value>,
}

/// Query parameters for GET requests.
#[derive(Debug, Default, Deserialize)]
pub struct GraphQLQueryParams {
    pub query: Option<String>,

    #[serde(rename = "operationName")]
    pub operation_name: Option<String>,

    /// Variables as a JSON string.
    pub variables: Option<String>,
}

/// Routes for the GraphQL endpoint, mounted at `config.path`.
pub fn graphql_router(state: GraphQLState) -> Router {
    let path = state.config.path.clone();
    Router::new()
        .route(&path, get(graphql_handler_get).post(graphql_handler))
        .with_state(state)
}

/// Handles `POST` requests.
pub async fn graphql_handler(
    State(state): State<GraphQLState>,
    headers: HeaderMap,
    Json(request): Json<GraphQLRequest>,
) -> Response {
    debug!(operation = ?request.operation_name, "Processing GraphQL request");
    execute_graphql(&state, &headers, request).await
}

/// Handles `GET` requests.
pub async fn graphql_handler_get(
    State(state): State<GraphQLState>,
    headers: HeaderMap,
    Query(params): Query<GraphQLQueryParams>,
) -> Response {
    if params.query.is_none() && state.config.playground {
        return Html(playground_source(GraphQLPlaygroundConfig::new(&state.config.path)))
            .into_response();
    }

    let request = match params_to_request(params) {
        Ok(request) => request,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, &message),
    };

    debug!(operation = ?request.operation_name, "Processing GraphQL GET request");
    execute_graphql(&state, &headers, request).await
}

async fn execute_graphql(state: &GraphQLState, headers: &HeaderMap, request: GraphQLRequest) -> Response {
    let mut gql_request = Request::new(request.query);

    if let Some(operation_name) = request.operation_name {
        gql_request = gql_request.operation_name(operation_name);
    }
    if let Some(variables) = request.variables {
        gql_request = gql_request.variables(Variables::from_json(variables));
    }
    if let Some(provider) = &state.context_provider {
        gql_request = gql_request.data(provider.provide(headers));
    }

    GraphQLResponse::from(state.schema.execute(gql_request).await).into_response()
}

/// Converts GET query params to a GraphQL request.
fn params_to_request(params: GraphQLQueryParams) -> Result<GraphQLRequest, String> {
    let query = params
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| "missing `query` parameter".to_string())?;

    let variables = match params.variables {
        Some(raw) => Some(
            serde_json::from_str(&raw).map_err(|e| format!("`variables` is not valid JSON: {e}"))?,
        ),
        None => None,
    };

    Ok(GraphQLRequest {
        query,
        operation_name: params.operation_name,
        variables,
    })
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({
        "errors": [{ "message": message }]
    });
    (status, [(header::CONTENT_TYPE, "application/json")], Json(body)).into_response()
}
