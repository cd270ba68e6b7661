//! Config source for the service table compiled into the binary.

use async_trait::async_trait;

use crate::config::model::Config;
use crate::config::ConfigSource;
use crate::error::GatewayError;

#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinSource;

#[async_trait]
impl ConfigSource for BuiltinSource {
    fn name(&self) -> &'static str {
        "built-in"
    }

    async fn load(&self) -> Result<Config, GatewayError> {
        Ok(Config::builtin())
    }
}
