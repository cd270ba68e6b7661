//! Serde data structures for the gateway configuration file.
//!
//! Contains [`Config`] (the root), [`Service`], [`Route`], [`Defaults`],
//! [`RateLimitConfig`], [`CorsConfig`] and [`AccessLogConfig`]. All types
//! derive `Serialize` and `Deserialize` with `deny_unknown_fields` for
//! strict parsing. Every section except `services` and `routes` is
//! optional and falls back to the documented defaults below.

use serde::{Deserialize, Serialize};

const fn default_timeout() -> u64 {
    10_000
}

const fn default_true() -> bool {
    true
}

const fn default_max_requests() -> u64 {
    100
}

const fn default_window_secs() -> u64 {
    15 * 60
}

const fn default_log_capacity() -> usize {
    100
}

fn default_user_agent() -> String {
    concat!("gatehouse/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_methods() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_cors_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"]
        .iter()
        .map(|m| (*m).to_string())
        .collect()
}

fn default_cors_headers() -> Vec<String> {
    ["Content-Type", "Authorization", "Cookie"]
        .iter()
        .map(|h| (*h).to_string())
        .collect()
}

fn is_default_methods(v: &[String]) -> bool {
    v.len() == 1 && v[0] == "*"
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub cors: CorsConfig,

    #[serde(default)]
    pub access_log: AccessLogConfig,

    pub services: Vec<Service>,

    /// Tested in order; the first matching route wins.
    pub routes: Vec<Route>,
}

impl Config {
    /// The service table the gateway ships with: five backends on local
    /// ports, each overridable through its `*_SERVICE_URL` variable.
    #[must_use]
    pub fn builtin() -> Self {
        let service = |name: &str, display: &str, port: u16, env: &str, endpoints: usize| Service {
            name: name.into(),
            display_name: Some(display.into()),
            base_url: Some(format!("http://localhost:{port}")),
            base_url_env: Some(env.into()),
            timeout: None,
            endpoints: Some(endpoints),
        };
        let route = |path: &str, service: &str| Route {
            path: path.into(),
            service: service.into(),
            methods: default_methods(),
        };

        Self {
            defaults: Defaults::default(),
            rate_limit: RateLimitConfig::default(),
            cors: CorsConfig::default(),
            access_log: AccessLogConfig::default(),
            services: vec![
                service("auth", "Authentication Service", 4001, "AUTH_SERVICE_URL", 5),
                service("emotion", "Emotion Detection Service", 4002, "EMOTION_SERVICE_URL", 1),
                service("analytics", "Analytics Service", 4003, "ANALYTICS_SERVICE_URL", 1),
                service("notification", "Notification Service", 4004, "NOTIFICATION_SERVICE_URL", 1),
                service("video", "Video Service", 4005, "VIDEO_SERVICE_URL", 4),
            ],
            routes: vec![
                route("/api/auth/*", "auth"),
                route("/api/emotion-service", "emotion"),
                route("/api/logs/*", "analytics"),
                route("/api/send-email", "notification"),
                route("/api/upload", "video"),
                route("/api/videos/*", "video"),
            ],
        }
    }

    #[must_use]
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Number of routes pointing at `service`.
    #[must_use]
    pub fn routes_for(&self, service: &str) -> usize {
        self.routes.iter().filter(|r| r.service == service).count()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Upstream timeout in milliseconds, covering connect, headers and body.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Add `X-Forwarded-*` and `X-Correlation-Id` to outbound requests.
    #[serde(default = "default_true")]
    pub proxy_headers: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            proxy_headers: default_true(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_requests")]
    pub max_requests: u64,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Exact paths that bypass the limiter. Empty means every request counts.
    #[serde(default)]
    pub exempt_paths: Vec<String>,

    /// Key clients by the first `X-Forwarded-For` address instead of the peer address.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            exempt_paths: Vec::new(),
            trust_forwarded_for: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    #[serde(default = "default_origins")]
    pub allowed_origins: Vec<String>,

    #[serde(default = "default_cors_methods")]
    pub allowed_methods: Vec<String>,

    #[serde(default = "default_cors_headers")]
    pub allowed_headers: Vec<String>,

    #[serde(default = "default_true")]
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_origins(),
            allowed_methods: default_cors_methods(),
            allowed_headers: default_cors_headers(),
            allow_credentials: default_true(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AccessLogConfig {
    #[serde(default = "default_log_capacity")]
    pub capacity: usize,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            capacity: default_log_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Service {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Environment variable that overrides `base_url` when set and non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Advertised endpoint count; defaults to the number of routes for the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<usize>,
}

impl Service {
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Route {
    /// Exact path (`/api/upload`), wildcard prefix (`/api/auth/*`) or catch-all (`/*`).
    pub path: String,

    pub service: String,

    #[serde(
        default = "default_methods",
        skip_serializing_if = "is_default_methods"
    )]
    pub methods: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_matches_known_prefixes() {
        let config = Config::builtin();
        let paths: Vec<&str> = config.routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "/api/auth/*",
                "/api/emotion-service",
                "/api/logs/*",
                "/api/send-email",
                "/api/upload",
                "/api/videos/*",
            ]
        );
        assert_eq!(config.routes_for("video"), 2);
        assert!(config.routes.iter().all(|r| config.service(&r.service).is_some()));
    }

    #[test]
    fn sections_default_when_omitted() {
        let json = r#"{
            "services": [{"name": "auth", "base_url": "http://auth:80"}],
            "routes": [{"path": "/api/auth/*", "service": "auth"}]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.defaults.timeout, 10_000);
        assert!(config.defaults.proxy_headers);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_secs, 900);
        assert!(config.rate_limit.exempt_paths.is_empty());
        assert_eq!(config.access_log.capacity, 100);
        assert_eq!(config.routes[0].methods, vec!["*"]);
        assert_eq!(config.services[0].display_name(), "auth");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let json = r#"{"services": [], "routes": [], "extra": 1}"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }
}
