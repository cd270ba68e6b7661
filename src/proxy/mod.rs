//! Core HTTP request forwarding handler.
//!
//! The [`forward_handler`] function is the Axum fallback that receives
//! every request not served by an introspection route, resolves it
//! against the ordered route table, forwards it, and records exactly one
//! access-log entry for the outcome. Submodules handle route matching
//! ([`routing`]), header construction ([`headers`]), and the outbound
//! call ([`forward`]).

pub mod forward;
pub mod headers;
pub mod routing;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::access_log::NewEntry;
use crate::server::AppState;

#[allow(clippy::cast_possible_truncation)]
pub async fn forward_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    req_headers: HeaderMap,
    body: Bytes,
) -> Response {
    let received_at = Instant::now();
    let path = uri.path();
    let correlation_id = req_headers
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

    let Some(matched) = state.routes.resolve(method.as_str(), path, uri.query()) else {
        tracing::warn!(
            correlation_id = %correlation_id,
            method = %method,
            path = %path,
            "no route matched"
        );
        return route_not_found(path, state.routes.prefixes());
    };

    let service = matched.service;
    tracing::info!(
        correlation_id = %correlation_id,
        method = %method,
        path = %path,
        service = %service.name,
        target_url = %matched.target_url,
        "forwarding request"
    );

    let client_ip = addr.ip().to_string();
    let defaults = &state.config.config.defaults;
    let outcome = forward::forward(forward::ForwardRequest {
        client: &state.http_client,
        method: &method,
        target_url: &matched.target_url,
        service,
        original_headers: &req_headers,
        body,
        client_ip: &client_ip,
        user_agent: &defaults.user_agent,
        proxy_headers: defaults.proxy_headers,
        correlation_id: &correlation_id,
    })
    .await;

    let latency_ms = received_at.elapsed().as_millis() as u64;

    if let Some(err) = &outcome.error {
        state.stats.failed.fetch_add(1, Ordering::Relaxed);
        tracing::error!(
            correlation_id = %correlation_id,
            service = %service.name,
            error = %err,
            latency_ms,
            "proxy error"
        );
    } else {
        state.stats.forwarded.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            correlation_id = %correlation_id,
            service = %service.name,
            status = outcome.status.as_u16(),
            latency_ms,
            "upstream responded"
        );
    }

    state.access_log.record(NewEntry {
        method: method.to_string(),
        path: path.to_string(),
        target_service: service.name.clone(),
        status_code: outcome.status.as_u16(),
        response_time_ms: latency_ms,
    });

    outcome.into_response(&correlation_id)
}

/// Terminal response for paths no route claims.
pub fn route_not_found(path: &str, available: Vec<String>) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "API endpoint not found",
            "path": path,
            "availableServices": available,
        })),
    )
        .into_response()
}
