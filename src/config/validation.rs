//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`Config`] (after
//! environment overrides are applied) for everything the gateway cannot
//! safely start without: every service needs a well-formed `http(s)`
//! base URL, every route must reference a known service, and the rate
//! limiter, access log and timeouts need non-zero bounds. Returns a list
//! of [`ValidationError`] values with per-field suggestions.

use std::collections::HashSet;

use url::Url;

use super::model::Config;
use crate::error::ValidationError;

pub const VALID_METHODS: &[&str] = &[
    "GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "*",
];

/// Validate a single route pattern. Returns `Ok(())` or a human-readable error.
pub fn validate_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("path cannot be empty".into());
    }
    if !path.starts_with('/') {
        return Err(format!("path must start with '/' (did you mean '/{path}'?)"));
    }
    if let Some(idx) = path.find('*') {
        if idx != path.len() - 1 || !path.ends_with("/*") {
            return Err("'*' is only allowed as a trailing '/*' segment".into());
        }
    }
    Ok(())
}

/// Validate a service base URL. Returns `Ok(())` or a human-readable error.
pub fn validate_base_url(url: &str) -> Result<(), String> {
    match Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            if scheme != "http" && scheme != "https" {
                Err(format!(
                    "unsupported scheme '{scheme}' (expected http or https)"
                ))
            } else if parsed.host_str().is_none() {
                Err(format!("'{url}' has no host"))
            } else if parsed.query().is_some() {
                Err("base URL must not carry a query string".into())
            } else {
                Ok(())
            }
        }
        Err(_) => Err(format!("'{url}' is not a valid URL")),
    }
}

/// Validate an HTTP method string. Returns `Ok(())` or a human-readable error.
pub fn validate_method(method: &str) -> Result<(), String> {
    let upper = method.to_uppercase();
    if VALID_METHODS.contains(&upper.as_str()) {
        Ok(())
    } else {
        Err(format!("'{method}' is not a valid HTTP method"))
    }
}

#[allow(clippy::too_many_lines)]
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.defaults.timeout == 0 {
        errors.push(ValidationError::new(
            "defaults",
            "timeout",
            "timeout must be greater than 0 ms",
        ));
    }

    if config.rate_limit.max_requests == 0 {
        errors.push(
            ValidationError::new("rate_limit", "max_requests", "must be at least 1")
                .with_suggestion("set rate_limit.enabled: false to disable limiting"),
        );
    }
    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::new(
            "rate_limit",
            "window_secs",
            "window must be at least 1 second",
        ));
    }

    if config.access_log.capacity == 0 {
        errors.push(ValidationError::new(
            "access_log",
            "capacity",
            "capacity must be at least 1",
        ));
    }

    for method in &config.cors.allowed_methods {
        if method == "*" {
            continue;
        }
        if let Err(msg) = validate_method(method) {
            errors.push(ValidationError::new("cors", "allowed_methods", msg));
        }
    }

    if config.services.is_empty() {
        errors.push(ValidationError::new(
            "(root)",
            "services",
            "at least one service must be defined",
        ));
    }

    let mut seen_services = HashSet::new();
    for (i, service) in config.services.iter().enumerate() {
        let scope = if service.name.is_empty() {
            format!("services[{i}]")
        } else {
            format!("services[{}]", service.name)
        };

        if service.name.is_empty() {
            errors.push(ValidationError::new(&scope, "name", "name cannot be empty"));
        } else if !seen_services.insert(service.name.as_str()) {
            errors.push(ValidationError::new(&scope, "name", "duplicate service name"));
        }

        match service.base_url.as_deref() {
            None | Some("") => {
                let mut err = ValidationError::new(&scope, "base_url", "no base URL configured");
                if let Some(ref var) = service.base_url_env {
                    err = err.with_suggestion(format!("set {var} or base_url"));
                }
                errors.push(err);
            }
            Some(url) => {
                if let Err(msg) = validate_base_url(url) {
                    errors.push(ValidationError::new(&scope, "base_url", msg));
                }
            }
        }

        if service.timeout == Some(0) {
            errors.push(ValidationError::new(
                &scope,
                "timeout",
                "timeout must be greater than 0 ms",
            ));
        }
    }

    if config.routes.is_empty() {
        errors.push(ValidationError::new(
            "(root)",
            "routes",
            "at least one route must be defined",
        ));
    }

    let mut seen_paths = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        let scope = if route.path.is_empty() {
            format!("routes[{i}]")
        } else {
            format!("routes[{}]", route.path)
        };

        if let Err(msg) = validate_path(&route.path) {
            let mut err = ValidationError::new(&scope, "path", msg);
            if !route.path.is_empty() && !route.path.starts_with('/') {
                err = err.with_suggestion(format!("did you mean '/{}'?", route.path));
            }
            errors.push(err);
        }

        if !seen_paths.insert(&route.path) {
            errors.push(ValidationError::new(
                &scope,
                "path",
                "duplicate route path (only the first would ever match)",
            ));
        }

        if route.methods.is_empty() {
            errors.push(
                ValidationError::new(&scope, "methods", "at least one method is required")
                    .with_suggestion("use [\"*\"] to accept any method"),
            );
        }
        for method in &route.methods {
            if let Err(msg) = validate_method(method) {
                errors.push(ValidationError::new(&scope, "methods", msg));
            }
        }

        if config.service(&route.service).is_none() {
            let known: Vec<&str> = config.services.iter().map(|s| s.name.as_str()).collect();
            errors.push(
                ValidationError::new(
                    &scope,
                    "service",
                    format!("unknown service '{}'", route.service),
                )
                .with_suggestion(format!("known services: {}", known.join(", "))),
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[must_use]
pub fn format_validation_report(source: &str, config: &Config) -> String {
    let mut lines = vec![format!(
        "  {} services, {} routes\n",
        config.services.len(),
        config.routes.len()
    )];

    for service in &config.services {
        let timeout = service.timeout.map_or_else(
            || format!("{}ms (default)", config.defaults.timeout),
            |t| format!("{t}ms"),
        );
        lines.push(format!(
            "  {}  -> {}",
            service.name,
            service.base_url.as_deref().unwrap_or("none")
        ));
        lines.push(format!("    timeout: {timeout}"));
    }

    lines.push(String::new());
    for route in &config.routes {
        lines.push(format!(
            "  {}  -> {} [{}]",
            route.path,
            route.service,
            route.methods.join(", ")
        ));
    }

    lines.push(String::new());
    if config.rate_limit.enabled {
        lines.push(format!(
            "  rate limit: {} requests / {}s",
            config.rate_limit.max_requests, config.rate_limit.window_secs
        ));
    } else {
        lines.push("  rate limit: disabled".into());
    }

    format!("{} is valid\n{}", source, lines.join("\n"))
}
