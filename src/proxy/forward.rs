//! Single-target forwarding with a bounded timeout.
//!
//! [`forward`] sends one outbound request per inbound request and always
//! produces a [`ProxyOutcome`]: upstream responses are mirrored, while
//! transport failures, timeouts and undecodable JSON become a synthesized
//! `502 Bad Gateway` naming the service. Nothing is retried. The timeout
//! spans connect, response head and body collection, so a backend that
//! stalls mid-body is treated exactly like one that never answers.

use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};

use super::headers::{build_outbound_headers, content_type_or_default, strip_response_headers, OutboundContext};
use super::routing::ServiceTarget;
use crate::server::HttpClient;

const OPAQUE_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

pub struct ForwardRequest<'a> {
    pub client: &'a HttpClient,
    pub method: &'a Method,
    pub target_url: &'a str,
    pub service: &'a ServiceTarget,
    pub original_headers: &'a HeaderMap,
    pub body: Bytes,
    pub client_ip: &'a str,
    pub user_agent: &'a str,
    pub proxy_headers: bool,
    pub correlation_id: &'a str,
}

#[derive(Debug)]
pub struct ProxyOutcome {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Diagnostic for synthesized failures; `None` when the upstream answered.
    pub error: Option<String>,
}

impl ProxyOutcome {
    #[must_use]
    pub fn bad_gateway(service: &str, details: &str) -> Self {
        let body = serde_json::json!({
            "error": "Bad Gateway",
            "message": format!("Failed to connect to {service} service"),
            "details": details,
        });
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status: StatusCode::BAD_GATEWAY,
            headers,
            body: Bytes::from(body.to_string()),
            error: Some(details.to_string()),
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    pub fn into_response(self, correlation_id: &str) -> Response {
        let mut builder = Response::builder().status(self.status);
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }
        builder
            .header("x-correlation-id", correlation_id)
            .body(axum::body::Body::from(self.body))
            .unwrap_or_else(|e| {
                tracing::error!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "failed to build response"
                );
                StatusCode::BAD_GATEWAY.into_response()
            })
    }
}

pub async fn forward(req: ForwardRequest<'_>) -> ProxyOutcome {
    let service = req.service;

    let parsed_url = match url::Url::parse(req.target_url) {
        Ok(u) => u,
        Err(e) => {
            tracing::error!(url = %req.target_url, error = %e, "invalid target URL");
            return ProxyOutcome::bad_gateway(&service.name, &format!("invalid target URL: {e}"));
        }
    };

    let outbound_headers = build_outbound_headers(
        req.original_headers,
        &OutboundContext {
            client_ip: req.client_ip,
            target_url: &parsed_url,
            user_agent: req.user_agent,
            correlation_id: req.correlation_id,
            proxy_headers: req.proxy_headers,
        },
    );
    let content_type = content_type_or_default(req.original_headers);
    let body = outbound_body(req.method, &content_type, req.body);

    let mut req_builder = hyper::Request::builder()
        .method(req.method.clone())
        .uri(req.target_url);
    for (key, value) in &outbound_headers {
        req_builder = req_builder.header(key, value);
    }
    let outbound = match req_builder.body(Full::new(body)) {
        Ok(r) => r,
        Err(e) => return ProxyOutcome::bad_gateway(&service.name, &e.to_string()),
    };

    let client = req.client;
    let exchange = async move {
        let response = client.request(outbound).await.map_err(|e| error_chain(&e))?;
        let (parts, body) = response.into_parts();
        let collected = body
            .collect()
            .await
            .map_err(|e| format!("body read error: {}", error_chain(&e)))?;
        Ok::<_, String>((parts, collected.to_bytes()))
    };

    match tokio::time::timeout(service.timeout, exchange).await {
        Ok(Ok((parts, bytes))) => relay(&service.name, parts.status, parts.headers, bytes),
        Ok(Err(details)) => ProxyOutcome::bad_gateway(&service.name, &details),
        Err(_) => ProxyOutcome::bad_gateway(
            &service.name,
            &format!("request timed out after {}", format_duration(service.timeout)),
        ),
    }
}

/// GET and HEAD carry no body. JSON bodies are re-serialized (an empty
/// one becomes `{}`); anything else, including malformed JSON, passes
/// through byte-for-byte.
fn outbound_body(method: &Method, content_type: &HeaderValue, body: Bytes) -> Bytes {
    if *method == Method::GET || *method == Method::HEAD {
        return Bytes::new();
    }
    if !is_json(content_type) {
        return body;
    }
    if body.is_empty() {
        return Bytes::from_static(b"{}");
    }
    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(value) => serde_json::to_vec(&value).map_or(body, Bytes::from),
        Err(_) => body,
    }
}

fn relay(service: &str, status: StatusCode, mut headers: HeaderMap, body: Bytes) -> ProxyOutcome {
    strip_response_headers(&mut headers);

    let json = headers.get(CONTENT_TYPE).is_some_and(is_json);
    let body = if json && !body.is_empty() {
        match serde_json::from_slice::<serde_json::Value>(&body) {
            Ok(value) => serde_json::to_vec(&value).map_or(body, Bytes::from),
            Err(e) => {
                return ProxyOutcome::bad_gateway(service, &format!("invalid JSON from upstream: {e}"));
            }
        }
    } else {
        body
    };

    if !headers.contains_key(CONTENT_TYPE) && !body.is_empty() {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(OPAQUE_CONTENT_TYPE));
    }

    ProxyOutcome {
        status,
        headers,
        body,
        error: None,
    }
}

fn is_json(content_type: &HeaderValue) -> bool {
    content_type
        .to_str()
        .is_ok_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
}

/// Flatten an error and its sources; hyper's top-level messages alone
/// ("client error (Connect)") do not say what went wrong.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = inner.source();
    }
    message
}

fn format_duration(d: Duration) -> String {
    if d.subsec_millis() == 0 && d.as_secs() > 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}
