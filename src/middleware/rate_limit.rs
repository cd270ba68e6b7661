//! Admission control in front of every route.
//!
//! [`enforce`] keys each request by client identity and asks the shared
//! [`RateLimiter`](crate::limiter::RateLimiter) for a decision. Rejections
//! end the request with `429 Too Many Requests` and a `Retry-After`
//! header; no upstream is contacted. Paths listed in
//! `rate_limit.exempt_paths` and a disabled limiter bypass the check.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::RETRY_AFTER;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::limiter::Decision;
use crate::server::AppState;

const UNKNOWN_CLIENT: &str = "unknown";

pub async fn enforce(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let settings = &state.config.config.rate_limit;
    let path = request.uri().path();
    if !settings.enabled || settings.exempt_paths.iter().any(|p| p == path) {
        return next.run(request).await;
    }

    let key = client_key(&request, settings.trust_forwarded_for);
    let decision = state.limiter.admit(&key, Instant::now());
    match decision {
        Decision::Allow => next.run(request).await,
        Decision::Reject { retry_after, .. } => {
            state.stats.rate_limited.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                client = %key,
                method = %request.method(),
                path = %path,
                "rate limit exceeded"
            );
            let retry_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(RETRY_AFTER, retry_secs.max(1).to_string())],
                Json(serde_json::json!({
                    "error": "Too many requests",
                    "message": decision.message().unwrap_or_default(),
                })),
            )
                .into_response()
        }
    }
}

/// Peer IP, or the first `X-Forwarded-For` hop when the gateway sits
/// behind a trusted proxy.
#[must_use]
pub fn client_key(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| UNKNOWN_CLIENT.to_string(), |ConnectInfo(addr)| addr.ip().to_string())
}
