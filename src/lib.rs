//! Gatehouse is an HTTP API gateway for a small, fixed set of backends.
//!
//! It terminates client HTTP, applies CORS, security headers and a
//! per-client fixed-window rate limit, resolves each request against an
//! ordered route table, and forwards it to exactly one backend service.
//! Every forwarded request lands in a bounded in-memory access log that
//! the introspection endpoints expose alongside service metadata and
//! health.
//!
//! # Architecture
//!
//! - [`access_log`] -- Bounded, newest-first ring of proxied requests.
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, validate, health).
//! - [`config`] -- Configuration loading, environment overrides and
//!   validation via the [`ConfigSource`](config::ConfigSource) trait.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`health`] -- `GET /api/health` handler returning runtime diagnostics.
//! - [`introspection`] -- `/`, `/api/services` and `/api/logs` handlers.
//! - [`limiter`] -- Per-client fixed-window request counting.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`middleware`] -- CORS, security header and rate limit layers.
//! - [`proxy`] -- Route resolution, outbound header construction and
//!   single-target forwarding with a bounded timeout.
//! - [`server`] -- Axum server setup, shared application state, HTTP client,
//!   and graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |
//! | `file-backends` | All file format backends |
//! | `full` | All features |

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod access_log;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod health;
pub mod introspection;
pub mod limiter;
pub mod logging;
pub mod middleware;
pub mod proxy;
pub mod server;
