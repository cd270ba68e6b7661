//! Policy middleware applied ahead of route resolution.
//!
//! Runs in a fixed order (see [`build_router`](crate::server::build_router)):
//! [`cors`] answers preflights and decorates responses, [`security_headers`]
//! hardens every response, and [`rate_limit`] rejects clients over their
//! window before any outbound call is attempted.

pub mod cors;
pub mod rate_limit;
pub mod security_headers;
