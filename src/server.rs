//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared state holding the validated
//! config, compiled route table, HTTP client, rate limiter, access log,
//! stats and uptime), [`build_router`] for constructing the Axum router
//! with the policy chain, [`build_http_client`] for the connection-pooled
//! hyper client, and [`shutdown_signal`] for SIGTERM / Ctrl+C handling.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::access_log::AccessLog;
use crate::config::model::Config;
use crate::config::ConfigVersion;
use crate::error::GatewayError;
use crate::health::health_handler;
use crate::introspection;
use crate::limiter::RateLimiter;
use crate::middleware;
use crate::proxy;
use crate::proxy::routing::RouteTable;

#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    pub version: ConfigVersion,
    pub source_name: String,
}

#[derive(Debug)]
pub struct Stats {
    pub forwarded: AtomicU64,
    pub failed: AtomicU64,
    pub rate_limited: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            forwarded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
        }
    }
}

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
pub type HttpClient = Client<HttpsConnector, http_body_util::Full<bytes::Bytes>>;

pub struct AppState {
    pub config: LoadedConfig,
    pub routes: RouteTable,
    pub http_client: HttpClient,
    pub limiter: RateLimiter,
    pub access_log: AccessLog,
    pub start_time: Instant,
    pub stats: Stats,
}

impl AppState {
    /// Compile the route table and size the limiter and access log from
    /// an already validated config.
    pub fn new(config: LoadedConfig, http_client: HttpClient) -> Result<Self, GatewayError> {
        let routes = RouteTable::from_config(&config.config)?;
        let limiter = RateLimiter::new(
            config.config.rate_limit.max_requests,
            Duration::from_secs(config.config.rate_limit.window_secs),
        );
        let access_log = AccessLog::new(config.config.access_log.capacity);

        Ok(Self {
            config,
            routes,
            http_client,
            limiter,
            access_log,
            start_time: Instant::now(),
            stats: Stats::new(),
        })
    }
}

#[must_use]
pub fn build_http_client() -> HttpClient {
    // When multiple rustls crypto providers are compiled in, rustls cannot
    // auto-detect which one to use. Explicitly install `ring` as the default.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(https)
}

/// Routes plus the policy chain. Layers listed first run first: tracing,
/// body limit, CORS (answers preflights), security headers, rate limiting.
/// Any method other than GET on an introspection path falls through to
/// the forwarding handler, which answers with the JSON 404.
pub fn build_router(state: Arc<AppState>, max_body: usize) -> Router {
    let cors = middleware::cors::cors_layer(&state.config.config.cors);

    Router::new()
        .route("/", get(introspection::root_handler))
        .route("/api/health", get(health_handler))
        .route("/api/services", get(introspection::services_handler))
        .route("/api/logs", get(introspection::logs_handler))
        .fallback(proxy::forward_handler)
        .method_not_allowed_fallback(proxy::forward_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_body))
                .layer(cors)
                .layer(axum::middleware::from_fn(
                    middleware::security_headers::add_security_headers,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    Arc::clone(&state),
                    middleware::rate_limit::enforce,
                )),
        )
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
