//! Health check endpoint
//!
//! `GET /health` pings the catalog store. 200 with cache statistics when the
//! store answers, 503 when it does not.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::warn;

use crate::cache::CacheStats;
use crate::server::AppState;
use crate::services::json_response;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub database: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result cache counters
#[derive(Debug, Serialize)]
pub struct CacheHealth {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Hit rate percentage
    pub hit_rate: f64,
}

impl From<CacheStats> for CacheHealth {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            entries: stats.entries,
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
        }
    }
}

fn build_health_response(state: &AppState) -> (StatusCode, HealthResponse) {
    let timestamp = chrono::Utc::now().to_rfc3339();

    match state.services.catalog.db().ping() {
        Ok(()) => (
            StatusCode::OK,
            HealthResponse {
                status: "healthy",
                timestamp,
                database: "connected",
                version: env!("CARGO_PKG_VERSION"),
                cache: Some(state.services.cache.stats().into()),
                error: None,
            },
        ),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                HealthResponse {
                    status: "unhealthy",
                    timestamp,
                    database: "disconnected",
                    version: env!("CARGO_PKG_VERSION"),
                    cache: None,
                    error: Some(e.public_message()),
                },
            )
        }
    }
}

pub fn health_check(state: &AppState) -> Response<Full<Bytes>> {
    let (status, body) = build_health_response(state);
    json_response(status, &body)
}
