//! Concrete [`ConfigSource`](super::ConfigSource) implementations.
//!
//! Provides the file-based source (YAML, JSON, TOML gated by feature
//! flags), the built-in service table used when no file is present, and
//! the [`parse_config_str`] helper for format-specific deserialization.

pub mod builtin;
pub mod file_source;

use sha2::{Digest, Sha256};

use crate::config::model::Config;
use crate::error::GatewayError;

/// Parse a config string based on file extension.
pub fn parse_config_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<Config, GatewayError> {
    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => serde_yml::from_str(content).map_err(|e| GatewayError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "json")]
        "json" => serde_json::from_str(content).map_err(|e| GatewayError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "toml")]
        "toml" => toml::from_str(content).map_err(|e| GatewayError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        other => Err(GatewayError::UnsupportedFormat(other.to_string())),
    }
}

/// Compute a lowercase hex-encoded SHA-256 digest.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
