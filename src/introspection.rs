//! Read-only descriptor endpoints: `GET /`, `GET /api/services` and
//! `GET /api/logs`.
//!
//! Each handler builds a snapshot from the immutable config and the
//! current access-log contents.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::access_log::ProxyLogEntry;
use crate::health::observed_status;
use crate::server::AppState;

pub const DEFAULT_LOG_LIMIT: usize = 100;

pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub id: usize,
    pub name: String,
    pub display_name: String,
    pub base_url: String,
    pub status: String,
    pub response_time: Option<u64>,
    pub last_checked: Option<String>,
    pub endpoints: usize,
}

pub async fn services_handler(State(state): State<Arc<AppState>>) -> Json<Vec<ServiceDescriptor>> {
    let config = &state.config.config;
    let descriptors = config
        .services
        .iter()
        .enumerate()
        .map(|(i, service)| {
            let latest = state.access_log.latest_for(&service.name);
            ServiceDescriptor {
                id: i + 1,
                name: service.name.clone(),
                display_name: service.display_name().to_string(),
                base_url: service.base_url.clone().unwrap_or_default(),
                status: observed_status(latest.as_ref()).to_string(),
                response_time: latest.as_ref().map(|e| e.response_time_ms),
                last_checked: latest.map(|e| e.timestamp),
                endpoints: service
                    .endpoints
                    .unwrap_or_else(|| config.routes_for(&service.name)),
            }
        })
        .collect();
    Json(descriptors)
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<String>,
}

/// Missing, zero or non-numeric limits fall back to [`DEFAULT_LOG_LIMIT`].
#[must_use]
pub fn parse_limit(raw: Option<&str>) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_LOG_LIMIT)
}

pub async fn logs_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogsQuery>,
) -> Json<Vec<ProxyLogEntry>> {
    Json(state.access_log.list(parse_limit(query.limit.as_deref())))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootDescriptor {
    pub name: String,
    pub version: String,
    pub status: String,
    pub endpoints: RootEndpoints,
    pub microservices: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootEndpoints {
    pub health: String,
    pub services: String,
    pub logs: String,
}

pub async fn root_handler(State(state): State<Arc<AppState>>) -> Json<RootDescriptor> {
    Json(RootDescriptor {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
        endpoints: RootEndpoints {
            health: "/api/health".into(),
            services: "/api/services".into(),
            logs: "/api/logs".into(),
        },
        microservices: state.routes.prefixes(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_parsing_is_lenient() {
        assert_eq!(parse_limit(None), 100);
        assert_eq!(parse_limit(Some("5")), 5);
        assert_eq!(parse_limit(Some(" 7 ")), 7);
        assert_eq!(parse_limit(Some("0")), 100);
        assert_eq!(parse_limit(Some("-3")), 100);
        assert_eq!(parse_limit(Some("ten")), 100);
    }
}
