//! Outbound header construction and response header sanitation.
//!
//! [`build_outbound_headers`] does not clone the client's headers: the
//! gateway forwards only what the backends need. `Authorization` and
//! `Cookie` pass through verbatim, `User-Agent` identifies the gateway,
//! `Content-Type` defaults to JSON, and `Host` names the target. Proxy
//! metadata (`X-Forwarded-*`, `X-Correlation-Id`) is added when enabled.
//! [`strip_response_headers`] cleans upstream responses before relay.

use std::sync::LazyLock;

use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST, USER_AGENT};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "transfer-encoding",
        "te",
        "trailer",
        "upgrade",
        "proxy-authorization",
        "proxy-authenticate",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// Strip hop-by-hop headers, `content-length` and `x-powered-by` from an
/// upstream response.
///
/// The body is fully collected (and JSON bodies re-encoded) before relay,
/// so the origin's framing headers are no longer accurate. Axum sets the
/// correct `content-length` from the final body.
pub fn strip_response_headers(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove(CONTENT_LENGTH);
    headers.remove("x-powered-by");
}

pub struct OutboundContext<'a> {
    pub client_ip: &'a str,
    pub target_url: &'a url::Url,
    pub user_agent: &'a str,
    pub correlation_id: &'a str,
    pub proxy_headers: bool,
}

/// Inbound `Content-Type`, or JSON when the client sent none.
#[must_use]
pub fn content_type_or_default(original: &HeaderMap) -> HeaderValue {
    original
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE))
}

pub fn build_outbound_headers(original: &HeaderMap, ctx: &OutboundContext<'_>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(CONTENT_TYPE, content_type_or_default(original));

    match HeaderValue::from_str(ctx.user_agent) {
        Ok(val) => {
            headers.insert(USER_AGENT, val);
        }
        Err(_) => {
            tracing::warn!(user_agent = %ctx.user_agent, "invalid user agent, sending none");
        }
    }

    for name in [AUTHORIZATION, COOKIE] {
        if let Some(value) = original.get(&name) {
            headers.insert(name, value.clone());
        }
    }

    if let Some(host) = ctx.target_url.host_str() {
        let host_value = ctx
            .target_url
            .port()
            .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));
        if let Ok(val) = HeaderValue::from_str(&host_value) {
            headers.insert(HOST, val);
        }
    }

    if ctx.proxy_headers {
        // X-Forwarded-For: append to chain
        let xff = original
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map_or_else(
                || ctx.client_ip.to_string(),
                |existing| format!("{existing}, {}", ctx.client_ip),
            );
        if let Ok(val) = HeaderValue::from_str(&xff) {
            headers.insert("x-forwarded-for", val);
        }

        let proto = original
            .get("x-forwarded-proto")
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("http"));
        headers.insert("x-forwarded-proto", proto);

        if let Some(original_host) = original.get(HOST) {
            headers.insert("x-forwarded-host", original_host.clone());
        }

        if let Ok(val) = HeaderValue::from_str(ctx.correlation_id) {
            headers.insert("x-correlation-id", val);
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(target: &'a url::Url, proxy_headers: bool) -> OutboundContext<'a> {
        OutboundContext {
            client_ip: "10.0.0.1",
            target_url: target,
            user_agent: "gatehouse/test",
            correlation_id: "test-id",
            proxy_headers,
        }
    }

    #[test]
    fn forwards_only_credentials_from_client() {
        let mut original = HeaderMap::new();
        original.insert("authorization", "Bearer abc".parse().unwrap());
        original.insert("cookie", "session=1".parse().unwrap());
        original.insert("x-secret-internal", "leak".parse().unwrap());
        original.insert("connection", "keep-alive".parse().unwrap());

        let target = url::Url::parse("http://auth:8080").unwrap();
        let result = build_outbound_headers(&original, &ctx(&target, false));

        assert_eq!(result.get("authorization").unwrap(), "Bearer abc");
        assert_eq!(result.get("cookie").unwrap(), "session=1");
        assert!(result.get("x-secret-internal").is_none());
        assert!(result.get("connection").is_none());
    }

    #[test]
    fn sets_fixed_user_agent_and_default_content_type() {
        let mut original = HeaderMap::new();
        original.insert("user-agent", "curl/8.0".parse().unwrap());
        let target = url::Url::parse("http://auth:8080").unwrap();
        let result = build_outbound_headers(&original, &ctx(&target, false));

        assert_eq!(result.get("user-agent").unwrap(), "gatehouse/test");
        assert_eq!(result.get("content-type").unwrap(), "application/json");
    }

    #[test]
    fn keeps_inbound_content_type() {
        let mut original = HeaderMap::new();
        original.insert("content-type", "multipart/form-data; boundary=x".parse().unwrap());
        let target = url::Url::parse("http://video:8080").unwrap();
        let result = build_outbound_headers(&original, &ctx(&target, false));
        assert_eq!(
            result.get("content-type").unwrap(),
            "multipart/form-data; boundary=x"
        );
    }

    #[test]
    fn rewrites_host() {
        let target = url::Url::parse("http://backend:9090/path").unwrap();
        let result = build_outbound_headers(&HeaderMap::new(), &ctx(&target, false));
        assert_eq!(result.get("host").unwrap(), "backend:9090");
    }

    #[test]
    fn proxy_headers_append_forwarded_chain() {
        let mut original = HeaderMap::new();
        original.insert("x-forwarded-for", "1.2.3.4".parse().unwrap());
        original.insert("host", "gateway.local".parse().unwrap());

        let target = url::Url::parse("http://target:8080").unwrap();
        let result = build_outbound_headers(&original, &ctx(&target, true));

        assert_eq!(result.get("x-forwarded-for").unwrap(), "1.2.3.4, 10.0.0.1");
        assert_eq!(result.get("x-forwarded-host").unwrap(), "gateway.local");
        assert_eq!(result.get("x-forwarded-proto").unwrap(), "http");
        assert_eq!(result.get("x-correlation-id").unwrap(), "test-id");
    }

    #[test]
    fn proxy_headers_can_be_disabled() {
        let target = url::Url::parse("http://target:8080").unwrap();
        let result = build_outbound_headers(&HeaderMap::new(), &ctx(&target, false));
        assert!(result.get("x-forwarded-for").is_none());
        assert!(result.get("x-correlation-id").is_none());
    }

    #[test]
    fn response_headers_are_sanitized() {
        let mut headers = HeaderMap::new();
        headers.insert("transfer-encoding", "chunked".parse().unwrap());
        headers.insert("content-length", "42".parse().unwrap());
        headers.insert("x-powered-by", "Express".parse().unwrap());
        headers.insert("set-cookie", "a=b".parse().unwrap());
        strip_response_headers(&mut headers);
        assert_eq!(headers.len(), 1);
        assert!(headers.get("set-cookie").is_some());
    }
}
