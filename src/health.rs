//! `GET /api/health` endpoint handler.
//!
//! Returns a [`HealthResponse`] snapshot: gateway uptime and version,
//! config source metadata, cumulative request statistics, and a status
//! per configured service derived from the newest access-log entry for
//! that service. Nothing is probed and nothing is mutated.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::access_log::ProxyLogEntry;
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub services: Vec<ServiceHealth>,
    pub recent_request_count: usize,
    pub stats: StatsResponse,
    pub config: ConfigHealth,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub name: String,
    pub display_name: String,
    pub status: String,
    pub last_status_code: Option<u16>,
    pub response_time: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub requests_forwarded: u64,
    pub requests_failed: u64,
    pub requests_rate_limited: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigHealth {
    pub source: String,
    pub version: String,
    pub services: usize,
    pub routes: usize,
}

/// Status of a backend as last observed through the gateway.
#[must_use]
pub fn observed_status(latest: Option<&ProxyLogEntry>) -> &'static str {
    match latest.map(|e| e.status_code) {
        None => "unknown",
        Some(502 | 504) => "offline",
        Some(code) if code >= 500 => "degraded",
        Some(_) => "online",
    }
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let services = state
        .routes
        .services()
        .iter()
        .map(|service| {
            let latest = state.access_log.latest_for(&service.name);
            ServiceHealth {
                name: service.name.clone(),
                display_name: service.display_name.clone(),
                status: observed_status(latest.as_ref()).to_string(),
                last_status_code: latest.as_ref().map(|e| e.status_code),
                response_time: latest.as_ref().map(|e| e.response_time_ms),
            }
        })
        .collect();

    let loaded = &state.config;
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: crate::introspection::now_iso(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        services,
        recent_request_count: state.access_log.len(),
        stats: StatsResponse {
            requests_forwarded: state.stats.forwarded.load(Ordering::Relaxed),
            requests_failed: state.stats.failed.load(Ordering::Relaxed),
            requests_rate_limited: state.stats.rate_limited.load(Ordering::Relaxed),
        },
        config: ConfigHealth {
            source: loaded.source_name.clone(),
            version: loaded.version.short().to_string(),
            services: loaded.config.services.len(),
            routes: loaded.config.routes.len(),
        },
    })
}
