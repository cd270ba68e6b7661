//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, validate, health), and their associated argument
//! structs. Every `run` flag has an environment variable equivalent for
//! container deployments; backend base URLs are read from the
//! per-service variables named in the config (`AUTH_SERVICE_URL`, ...).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "gatehouse",
    version,
    about = "HTTP API gateway fronting a fixed set of backend services",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        gatehouse run                        Start with ./gatehouse.yaml or the built-in table\n  \
        gatehouse run -c gateway.yaml        Start with a specific config\n  \
        gatehouse validate gateway.yaml      Check a config without starting"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the gateway
    Run(Box<RunArgs>),

    /// Validate a config file (with environment overrides applied) without starting
    Validate(ValidateArgs),

    /// Check health of a running instance
    Health(HealthArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        gatehouse run                                     Auto-detect config\n  \
        gatehouse run -c gateway.yaml -p 8080 --pretty    Local dev mode\n  \
        AUTH_SERVICE_URL=http://auth:4001 gatehouse run   Override one backend")]
pub struct RunArgs {
    /// Config file path (.yaml, .json, .toml)
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Tuning --
    /// Upstream timeout in milliseconds (overrides defaults.timeout)
    #[arg(long, env = "REQUEST_TIMEOUT_MS", help_heading = "Tuning")]
    pub timeout: Option<u64>,

    /// Max request body size in bytes
    #[arg(
        long,
        env = "MAX_BODY_SIZE",
        default_value_t = 50 * 1024 * 1024,
        help_heading = "Tuning"
    )]
    pub max_body: usize,

    /// Requests allowed per client per window (overrides rate_limit.max_requests)
    #[arg(long, env = "RATE_LIMIT_MAX", help_heading = "Tuning")]
    pub rate_limit_max: Option<u64>,

    /// Rate-limit window in seconds (overrides rate_limit.window_secs)
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", help_heading = "Tuning")]
    pub rate_limit_window: Option<u64>,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Config file to validate; the built-in table when omitted
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Args)]
pub struct HealthArgs {
    /// URL of the running instance
    #[arg(default_value = "http://localhost:3000")]
    pub url: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}
