//! QMS Metrics API Module
//! REST endpoints for the admin database-health page, with OpenAPI documentation

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;
use utoipa::OpenApi;

use crate::engine::observability::{MetricsCollector, MetricsError};

pub const METRICS_BASE: &str = "/api/admin/mongodb-metrics";

#[derive(Clone)]
pub struct ApiState {
    pub collector: Arc<MetricsCollector>,
}

/// `{success, data?, error?}` wrapper shared by every metrics endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl<T> From<Result<T, MetricsError>> for ApiEnvelope<T> {
    fn from(result: Result<T, MetricsError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_summary,
        database_stats,
        slow_queries,
        missing_indexes,
        collection_latency,
    ),
    tags(
        (name = "mongodb-metrics", description = "MongoDB operational health"),
    )
)]
pub struct ApiDoc;

pub fn create_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        .route(METRICS_BASE, get(health_summary))
        .route(&format!("{}/stats", METRICS_BASE), get(database_stats))
        .route(&format!("{}/slow-queries", METRICS_BASE), get(slow_queries))
        .route(&format!("{}/missing-indexes", METRICS_BASE), get(missing_indexes))
        .route(&format!("{}/latency", METRICS_BASE), get(collection_latency))
        .route("/api/health", get(health_check))
        .route("/api/openapi.json", get(openapi_document))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %detail, "request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiEnvelope::<()>::failure("Internal server error")),
    )
        .into_response()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database_connected: bool,
}

async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database_connected: state.collector.ping().await.is_ok(),
    })
}

async fn openapi_document() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[utoipa::path(
    get,
    path = "/api/admin/mongodb-metrics",
    responses(
        (status = 200, description = "Health score, status, facets and recommendations", body = Value),
        (status = 500, description = "Unhandled failure", body = Value)
    ),
    tag = "mongodb-metrics"
)]
async fn health_summary(State(state): State<ApiState>) -> impl IntoResponse {
    Json(ApiEnvelope::from(state.collector.health_summary().await))
}

#[utoipa::path(
    get,
    path = "/api/admin/mongodb-metrics/stats",
    responses(
        (status = 200, description = "Database and server statistics", body = Value)
    ),
    tag = "mongodb-metrics"
)]
async fn database_stats(State(state): State<ApiState>) -> impl IntoResponse {
    Json(ApiEnvelope::from(state.collector.database_stats().await))
}

#[derive(Deserialize)]
pub struct SlowQueryParams {
    limit: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/admin/mongodb-metrics/slow-queries",
    params(
        ("limit" = Option<usize>, Query, description = "Maximum entries (default 10)"),
    ),
    responses(
        (status = 200, description = "Profiled operations above the slow threshold", body = Value)
    ),
    tag = "mongodb-metrics"
)]
async fn slow_queries(
    State(state): State<ApiState>,
    Query(params): Query<SlowQueryParams>,
) -> impl IntoResponse {
    // Unparseable limits fall back to the default instead of rejecting.
    let limit = params.limit.and_then(|l| l.trim().parse::<usize>().ok());
    Json(ApiEnvelope::from(state.collector.slow_queries(limit).await))
}

#[utoipa::path(
    get,
    path = "/api/admin/mongodb-metrics/missing-indexes",
    responses(
        (status = 200, description = "Collections with index recommendations", body = Value)
    ),
    tag = "mongodb-metrics"
)]
async fn missing_indexes(State(state): State<ApiState>) -> impl IntoResponse {
    Json(ApiEnvelope::from(state.collector.missing_indexes().await))
}

#[utoipa::path(
    get,
    path = "/api/admin/mongodb-metrics/latency",
    responses(
        (status = 200, description = "Per-collection findOne latency, slowest first", body = Value)
    ),
    tag = "mongodb-metrics"
)]
async fn collection_latency(State(state): State<ApiState>) -> impl IntoResponse {
    Json(ApiEnvelope::from(state.collector.collection_latency().await))
}
