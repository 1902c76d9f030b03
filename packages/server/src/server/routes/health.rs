use axum::{extract::Extension, http::StatusCode, Json};
use market_data::CacheKind;
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    cache: CacheHealth,
}

#[derive(Serialize)]
pub struct CacheHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cached_communities: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint
///
/// Checks the cache backend with a bounded count query. Returns 200 OK when it
/// answers, 503 Service Unavailable otherwise.
pub async fn health_handler(Extension(state): Extension<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let cache = match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        state.cache_store.count(CacheKind::Communities),
    )
    .await
    {
        Ok(Ok(count)) => CacheHealth {
            status: "ok".to_string(),
            cached_communities: Some(count),
            error: None,
        },
        Ok(Err(e)) => CacheHealth {
            status: "error".to_string(),
            cached_communities: None,
            error: Some(format!("Query failed: {}", e)),
        },
        Err(_) => CacheHealth {
            status: "error".to_string(),
            cached_communities: None,
            error: Some("Query timeout (>5s)".to_string()),
        },
    };

    let is_healthy = cache.status == "ok";
    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            cache,
        }),
    )
}
