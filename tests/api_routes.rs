use axum::body::Body;
use axum::http::{Request, StatusCode};
use qms_metrics_lib::engine::adapter::{
    MemoryCollection, MemorySource, MetricsSource, ProfileEntry, SourceCall,
};
use qms_metrics_lib::engine::api::{create_router, ApiState};
use qms_metrics_lib::engine::config::{CollectorConfig, HealthThresholds};
use qms_metrics_lib::engine::observability::MetricsCollector;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn router(source: Option<MemorySource>) -> axum::Router {
    let source = source.map(|s| Arc::new(s) as Arc<dyn MetricsSource>);
    let collector = MetricsCollector::new(source, CollectorConfig::default(), HealthThresholds::default());
    create_router(ApiState {
        collector: Arc::new(collector),
    })
}

async fn get(app: axum::Router, uri: &str) -> Result<(StatusCode, Value), Box<dyn std::error::Error>> {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

fn slow_entry(millis: u64, second: i64) -> ProfileEntry {
    ProfileEntry {
        timestamp: chrono::DateTime::from_timestamp(1_770_000_000 + second, 0),
        operation: "query".to_string(),
        namespace: "qms.findings".to_string(),
        millis,
        command: serde_json::json!({ "find": "findings", "filter": { "status": "open" } }),
        plan_summary: Some("COLLSCAN".to_string()),
    }
}

fn profiled_database() -> MemorySource {
    let mut source = MemorySource::new("qms")
        .with_collection(MemoryCollection::new("findings", 40).with_index("status_1", &["status"]));
    for i in 0..15 {
        source = source.with_profile_entry(slow_entry(200 + i as u64, i));
    }
    source
}

#[tokio::test]
async fn test_summary_envelope() -> Result<(), Box<dyn std::error::Error>> {
    let (status, body) = get(router(Some(profiled_database())), "/api/admin/mongodb-metrics").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body.get("error").is_none());

    let data = &body["data"];
    assert_eq!(data["slowQueries"].as_array().map(Vec::len), Some(5));
    assert_eq!(data["healthScore"], 75);
    assert_eq!(data["status"], "good");
    assert!(data["timestamp"].is_string());
    assert!(data["recommendations"][0]
        .as_str()
        .is_some_and(|r| r.starts_with("5 slow queries")));

    Ok(())
}

#[tokio::test]
async fn test_summary_succeeds_with_failed_slow_query_facet() -> Result<(), Box<dyn std::error::Error>> {
    let app = router(Some(profiled_database().failing(SourceCall::SlowOperations)));
    let (status, body) = get(app, "/api/admin/mongodb-metrics").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let data = &body["data"];
    assert_eq!(data["slowQueries"], serde_json::json!([]));
    assert_eq!(data["collectionLatency"].as_array().map(Vec::len), Some(1));
    assert_eq!(data["missingIndexes"], serde_json::json!([]));
    assert_eq!(data["healthScore"], 100);

    let unavailable = data["unavailable"].as_array().ok_or("unavailable missing")?;
    assert_eq!(unavailable.len(), 1);
    assert_eq!(unavailable[0]["facet"], "slowQueries");
    assert!(unavailable[0]["error"]
        .as_str()
        .is_some_and(|e| e.contains("SlowOperations")));

    Ok(())
}

#[tokio::test]
async fn test_not_connected_is_reported_in_envelope() -> Result<(), Box<dyn std::error::Error>> {
    for uri in [
        "/api/admin/mongodb-metrics",
        "/api/admin/mongodb-metrics/stats",
        "/api/admin/mongodb-metrics/slow-queries",
        "/api/admin/mongodb-metrics/missing-indexes",
        "/api/admin/mongodb-metrics/latency",
    ] {
        let (status, body) = get(router(None), uri).await?;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(
            body,
            serde_json::json!({ "success": false, "error": "Database connection not established" }),
            "{}",
            uri
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_slow_queries_limit() -> Result<(), Box<dyn std::error::Error>> {
    let cases = [("?limit=3", 3), ("", 10), ("?limit=abc", 10), ("?limit=0", 10), ("?limit=50", 15)];

    for (query, expected) in cases {
        let uri = format!("/api/admin/mongodb-metrics/slow-queries{}", query);
        let (status, body) = get(router(Some(profiled_database())), &uri).await?;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body["success"], true, "{}", uri);

        let queries = body["data"]["queries"].as_array().ok_or("queries missing")?;
        assert_eq!(queries.len(), expected, "{}", uri);
        assert_eq!(queries[0]["durationMs"], 214);
        assert_eq!(queries[0]["planSummary"], "COLLSCAN");
    }

    Ok(())
}

#[tokio::test]
async fn test_source_failure_in_single_endpoint() -> Result<(), Box<dyn std::error::Error>> {
    let app = router(Some(profiled_database().failing(SourceCall::DbStats)));
    let (status, body) = get(app, "/api/admin/mongodb-metrics/stats").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().is_some_and(|e| e.contains("DbStats")));
    assert!(body.get("data").is_none());

    Ok(())
}

#[tokio::test]
async fn test_panic_becomes_internal_error() -> Result<(), Box<dyn std::error::Error>> {
    let app = router(Some(profiled_database().panicking(SourceCall::CollectionNames)));
    let (status, body) = get(app, "/api/admin/mongodb-metrics/latency").await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        serde_json::json!({ "success": false, "error": "Internal server error" })
    );

    Ok(())
}

#[tokio::test]
async fn test_service_health_and_openapi() -> Result<(), Box<dyn std::error::Error>> {
    let (status, body) = get(router(None), "/api/health").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["databaseConnected"], false);

    let (_, body) = get(router(Some(profiled_database())), "/api/health").await?;
    assert_eq!(body["databaseConnected"], true);

    let (_, body) = get(router(Some(profiled_database().failing(SourceCall::Ping))), "/api/health").await?;
    assert_eq!(body["databaseConnected"], false);

    let (status, body) = get(router(Some(profiled_database())), "/api/openapi.json").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/admin/mongodb-metrics/slow-queries"].is_object());

    Ok(())
}
