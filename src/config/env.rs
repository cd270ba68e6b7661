//! Per-service base URL overrides from the process environment.
//!
//! Each [`Service`](super::model::Service) may name a `base_url_env`
//! variable. When that variable is set to a non-empty value it replaces
//! the configured `base_url`. Lookups go through a caller-supplied
//! function so tests never touch the real environment.

use super::model::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedOverride {
    pub service: String,
    pub var: String,
}

/// Read the real process environment.
#[must_use]
pub fn process_env(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Vec<AppliedOverride>
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = Vec::new();
    for service in &mut config.services {
        let Some(var) = service.base_url_env.as_deref() else {
            continue;
        };
        match lookup(var) {
            Some(value) if !value.trim().is_empty() => {
                service.base_url = Some(value.trim().to_string());
                applied.push(AppliedOverride {
                    service: service.name.clone(),
                    var: var.to_string(),
                });
            }
            _ => {}
        }
    }
    applied
}
