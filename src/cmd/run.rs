//! `gatehouse run` — start the gateway.
//!
//! Resolves the config source (explicit file, auto-detected file, or the
//! built-in service table), applies environment and CLI overrides,
//! validates once, and serves until SIGTERM / Ctrl+C. Any config error
//! aborts startup before the listener is bound.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::RunArgs;
use crate::config::model::Config;
use crate::config::sources::builtin::BuiltinSource;
use crate::config::sources::file_source::FileSource;
use crate::config::{self, env, ConfigSource, ConfigVersion};
use crate::error::GatewayError;
use crate::logging;
use crate::server::{self, AppState, LoadedConfig};

pub async fn execute(args: RunArgs) -> Result<(), GatewayError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let source = resolve_source(args.config.as_deref()).await?;
    let (mut config, _) = config::load(source.as_ref(), env::process_env).await?;

    apply_cli_overrides(&mut config, &args);
    if let Err(errors) = config::validation::validate(&config) {
        return Err(GatewayError::ConfigValidation { errors });
    }
    let version = ConfigVersion::of(&config);

    let service_count = config.services.len();
    let route_count = config.routes.len();
    let rate_limit = format!(
        "{}/{}s",
        config.rate_limit.max_requests, config.rate_limit.window_secs
    );

    let state = Arc::new(AppState::new(
        LoadedConfig {
            config,
            version,
            source_name: source.name().to_string(),
        },
        server::build_http_client(),
    )?);

    for service in state.routes.services() {
        tracing::info!(
            service = %service.name,
            base_url = %service.base_url,
            timeout_ms = service.timeout.as_millis() as u64,
            "backend configured"
        );
    }

    let router = server::build_router(state, args.max_body);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        services = service_count,
        routes = route_count,
        rate_limit = %rate_limit,
        "gatehouse started"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown_signal())
    .await?;

    tracing::info!("gatehouse stopped");
    Ok(())
}

fn apply_cli_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(timeout) = args.timeout {
        config.defaults.timeout = timeout;
    }
    if let Some(max) = args.rate_limit_max {
        config.rate_limit.max_requests = max;
    }
    if let Some(window) = args.rate_limit_window {
        config.rate_limit.window_secs = window;
    }
}

/// Explicit file, else `./gatehouse.{yaml,yml,json,toml}`, else the built-in table.
pub(crate) async fn resolve_source(
    explicit: Option<&Path>,
) -> Result<Box<dyn ConfigSource>, GatewayError> {
    if let Some(path) = explicit {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(GatewayError::ConfigFileNotFound {
                path: path.to_path_buf(),
            });
        }
        return Ok(Box::new(FileSource::new(path)?));
    }

    let candidates = [
        "gatehouse.yaml",
        "gatehouse.yml",
        "gatehouse.json",
        "gatehouse.toml",
    ];

    for name in &candidates {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            match FileSource::new(&path) {
                Ok(source) => {
                    tracing::info!(path = %path.display(), "auto-detected config file");
                    return Ok(Box::new(source));
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping config file");
                }
            }
        }
    }

    tracing::info!("no config file found, using built-in service table");
    Ok(Box::new(BuiltinSource))
}
