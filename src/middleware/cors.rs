//! CORS policy built from [`CorsConfig`].
//!
//! A literal `*` origin combined with credentials is not something a
//! browser will accept, so in that case the request origin is mirrored
//! instead. Wildcard methods and headers are handled the same way.

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::model::CorsConfig;

#[must_use]
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let credentials = config.allow_credentials;

    let origin = if config.allowed_origins.iter().any(|o| o == "*") {
        if credentials {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::any()
        }
    } else {
        AllowOrigin::list(
            config
                .allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    let methods = if config.allowed_methods.iter().any(|m| m == "*") {
        if credentials {
            AllowMethods::mirror_request()
        } else {
            AllowMethods::any()
        }
    } else {
        AllowMethods::list(
            config
                .allowed_methods
                .iter()
                .filter_map(|m| Method::from_bytes(m.to_uppercase().as_bytes()).ok()),
        )
    };

    let headers = if config.allowed_headers.iter().any(|h| h == "*") {
        if credentials {
            AllowHeaders::mirror_request()
        } else {
            AllowHeaders::any()
        }
    } else {
        AllowHeaders::list(
            config
                .allowed_headers
                .iter()
                .filter_map(|h| h.parse::<HeaderName>().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(credentials)
}
