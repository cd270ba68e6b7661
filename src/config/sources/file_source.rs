//! Async file-based config source.
//!
//! [`FileSource`] implements [`ConfigSource`] for any supported format,
//! chosen from the file extension. It reads the file through Tokio and
//! deserializes it with [`parse_config_str`]; validation happens later,
//! once environment overrides have been applied.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::parse_config_str;
use crate::config::model::Config;
use crate::config::ConfigSource;
use crate::error::GatewayError;

pub struct FileSource {
    path: PathBuf,
    format: &'static str,
}

impl FileSource {
    /// Build a source for `path`, rejecting extensions this build cannot parse.
    pub fn new(path: &Path) -> Result<Self, GatewayError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let format = match ext {
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => "yaml",
            #[cfg(feature = "json")]
            "json" => "json",
            #[cfg(feature = "toml")]
            "toml" => "toml",
            other => return Err(GatewayError::UnsupportedFormat(other.to_string())),
        };
        Ok(Self {
            path: path.to_path_buf(),
            format,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_content(&self) -> Result<String, GatewayError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GatewayError::ConfigFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                GatewayError::Io(e)
            }
        })
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    fn name(&self) -> &'static str {
        self.format
    }

    async fn load(&self) -> Result<Config, GatewayError> {
        let content = self.read_content().await?;
        parse_config_str(self.format, &content, &self.path.display().to_string())
    }
}
