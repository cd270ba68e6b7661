//! Ordered first-match route resolution.
//!
//! [`RouteTable`] compiles the configured routes once at startup. Each
//! pattern is an exact path (`/api/upload`), a wildcard prefix
//! (`/api/auth/*`, matching `/api/auth/` and anything below it) or the
//! catch-all `/*`. Routes are tried in configuration order and the first
//! one whose pattern and method filter accept the request wins, so
//! ordering is part of the configuration contract. Resolution is pure:
//! it reads only the immutable table.

use std::time::Duration;

use url::Url;

use crate::config::model::Config;
use crate::error::GatewayError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    /// Segments that must prefix the request path, followed by at least one
    /// more segment or a trailing slash (an empty wildcard).
    Prefix(Vec<String>),
    CatchAll,
}

impl PathPattern {
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        if pattern == "/*" || pattern == "*" {
            return Self::CatchAll;
        }
        if let Some(prefix) = pattern.strip_suffix("/*") {
            return Self::Prefix(segments(prefix).map(String::from).collect());
        }
        Self::Exact(normalize(pattern))
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::CatchAll => true,
            Self::Exact(expected) => normalize(path) == *expected,
            Self::Prefix(prefix) => {
                let request: Vec<&str> = segments(path).collect();
                let below = request.len() > prefix.len()
                    || (request.len() == prefix.len() && path.ends_with('/'));
                below && prefix.iter().zip(&request).all(|(p, r)| p.as_str() == *r)
            }
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn normalize(path: &str) -> String {
    let joined: Vec<&str> = segments(path).collect();
    format!("/{}", joined.join("/"))
}

#[derive(Debug, Clone)]
pub struct ServiceTarget {
    pub name: String,
    pub display_name: String,
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CompiledRoute {
    pub pattern: String,
    pub matcher: PathPattern,
    pub methods: Vec<String>,
    service: usize,
}

#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route_index: usize,
    pub route: &'a CompiledRoute,
    pub service: &'a ServiceTarget,
    pub target_url: String,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
    services: Vec<ServiceTarget>,
}

impl RouteTable {
    /// Compile a validated config. Fails only if a base URL or service
    /// reference slipped past validation.
    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        let services = config
            .services
            .iter()
            .map(|s| {
                let raw = s.base_url.as_deref().unwrap_or_default();
                let base_url = Url::parse(raw).map_err(|e| GatewayError::UriParse {
                    source: format!("service '{}': {e}", s.name).into(),
                })?;
                Ok(ServiceTarget {
                    name: s.name.clone(),
                    display_name: s.display_name().to_string(),
                    base_url,
                    timeout: Duration::from_millis(s.timeout.unwrap_or(config.defaults.timeout)),
                })
            })
            .collect::<Result<Vec<_>, GatewayError>>()?;

        let routes = config
            .routes
            .iter()
            .map(|r| {
                let service = services
                    .iter()
                    .position(|s| s.name == r.service)
                    .ok_or_else(|| GatewayError::UriParse {
                        source: format!("route '{}' targets unknown service '{}'", r.path, r.service)
                            .into(),
                    })?;
                Ok(CompiledRoute {
                    pattern: r.path.clone(),
                    matcher: PathPattern::parse(&r.path),
                    methods: r.methods.clone(),
                    service,
                })
            })
            .collect::<Result<Vec<_>, GatewayError>>()?;

        Ok(Self { routes, services })
    }

    #[must_use]
    pub fn resolve(&self, method: &str, path: &str, query: Option<&str>) -> Option<RouteMatch<'_>> {
        let (route_index, route) = self
            .routes
            .iter()
            .enumerate()
            .find(|(_, r)| method_matches(&r.methods, method) && r.matcher.matches(path))?;
        let service = &self.services[route.service];
        Some(RouteMatch {
            route_index,
            route,
            service,
            target_url: target_url(&service.base_url, path, query),
        })
    }

    /// Configured patterns in resolution order.
    #[must_use]
    pub fn prefixes(&self) -> Vec<String> {
        self.routes.iter().map(|r| r.pattern.clone()).collect()
    }

    #[must_use]
    pub fn services(&self) -> &[ServiceTarget] {
        &self.services
    }

    #[must_use]
    pub fn routes(&self) -> &[CompiledRoute] {
        &self.routes
    }
}

fn method_matches(methods: &[String], method: &str) -> bool {
    methods
        .iter()
        .any(|m| m == "*" || m.eq_ignore_ascii_case(method))
}

/// Base URL (without trailing slash) + original path + original query.
fn target_url(base: &Url, path: &str, query: Option<&str>) -> String {
    let base = base.as_str().trim_end_matches('/');
    match query {
        Some(q) if !q.is_empty() => format!("{base}{path}?{q}"),
        _ => format!("{base}{path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{Route, Service};

    fn config(routes: &[(&str, &str)]) -> Config {
        let mut config = Config::builtin();
        config.services = ["auth", "video", "fallback"]
            .iter()
            .map(|name| Service {
                name: (*name).into(),
                display_name: None,
                base_url: Some(format!("http://{name}:8080")),
                base_url_env: None,
                timeout: None,
                endpoints: None,
            })
            .collect();
        config.routes = routes
            .iter()
            .map(|(path, service)| Route {
                path: (*path).into(),
                service: (*service).into(),
                methods: vec!["*".into()],
            })
            .collect();
        config
    }

    #[test]
    fn exact_match() {
        let table = RouteTable::from_config(&config(&[("/api/upload", "video")])).unwrap();
        let m = table.resolve("POST", "/api/upload", None).unwrap();
        assert_eq!(m.service.name, "video");
        assert_eq!(m.target_url, "http://video:8080/api/upload");
        assert!(table.resolve("POST", "/api/upload/more", None).is_none());
    }

    #[test]
    fn wildcard_requires_segment_below_prefix() {
        let table = RouteTable::from_config(&config(&[("/api/auth/*", "auth")])).unwrap();
        assert!(table.resolve("GET", "/api/auth/me", None).is_some());
        assert!(table.resolve("GET", "/api/auth/a/b/c", None).is_some());
        assert!(table.resolve("GET", "/api/auth", None).is_none());
        assert!(table.resolve("GET", "/api/authx/me", None).is_none());
    }

    #[test]
    fn wildcard_accepts_trailing_slash_as_empty_remainder() {
        let table = RouteTable::from_config(&config(&[("/api/auth/*", "auth")])).unwrap();
        let m = table.resolve("GET", "/api/auth/", None).unwrap();
        assert_eq!(m.service.name, "auth");
        assert_eq!(m.target_url, "http://auth:8080/api/auth/");
        assert!(table.resolve("GET", "/api/", None).is_none());
    }

    #[test]
    fn first_match_wins_over_more_specific_later_route() {
        let table = RouteTable::from_config(&config(&[
            ("/api/*", "fallback"),
            ("/api/auth/*", "auth"),
        ]))
        .unwrap();
        let m = table.resolve("GET", "/api/auth/me", None).unwrap();
        assert_eq!(m.route_index, 0);
        assert_eq!(m.service.name, "fallback");
    }

    #[test]
    fn query_string_is_reattached() {
        let table = RouteTable::from_config(&config(&[("/api/videos/*", "video")])).unwrap();
        let m = table
            .resolve("GET", "/api/videos/list", Some("page=2&sort=desc"))
            .unwrap();
        assert_eq!(m.target_url, "http://video:8080/api/videos/list?page=2&sort=desc");

        let m = table.resolve("GET", "/api/videos/list", Some("")).unwrap();
        assert_eq!(m.target_url, "http://video:8080/api/videos/list");
    }

    #[test]
    fn base_url_path_is_kept() {
        let mut cfg = config(&[("/api/auth/*", "auth")]);
        cfg.services[0].base_url = Some("https://gw.example.com/v1/".into());
        let table = RouteTable::from_config(&cfg).unwrap();
        let m = table.resolve("GET", "/api/auth/me", None).unwrap();
        assert_eq!(m.target_url, "https://gw.example.com/v1/api/auth/me");
    }

    #[test]
    fn method_filter() {
        let mut cfg = config(&[("/api/upload", "video"), ("/*", "fallback")]);
        cfg.routes[0].methods = vec!["POST".into()];
        let table = RouteTable::from_config(&cfg).unwrap();
        assert_eq!(table.resolve("post", "/api/upload", None).unwrap().service.name, "video");
        assert_eq!(table.resolve("GET", "/api/upload", None).unwrap().service.name, "fallback");
    }

    #[test]
    fn no_match() {
        let table = RouteTable::from_config(&config(&[("/api/upload", "video")])).unwrap();
        assert!(table.resolve("GET", "/api/nonexistent", None).is_none());
    }

    #[test]
    fn trailing_slash_on_exact_path() {
        let table = RouteTable::from_config(&config(&[("/api/send-email", "auth")])).unwrap();
        assert!(table.resolve("POST", "/api/send-email/", None).is_some());
    }

    #[test]
    fn prefixes_follow_configuration_order() {
        let table = RouteTable::from_config(&Config::builtin()).unwrap();
        assert_eq!(table.prefixes()[0], "/api/auth/*");
        assert_eq!(table.prefixes().len(), 6);
    }

    #[test]
    fn per_service_timeout_overrides_default() {
        let mut cfg = config(&[("/api/upload", "video")]);
        cfg.services[1].timeout = Some(250);
        let table = RouteTable::from_config(&cfg).unwrap();
        assert_eq!(table.services()[1].timeout, Duration::from_millis(250));
        assert_eq!(table.services()[0].timeout, Duration::from_millis(10_000));
    }
}
