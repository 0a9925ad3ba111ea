//! # Runtime
//!
//! Process wiring for the controller binary.
//!
//! - `initialization`: rustls, tracing, metrics, HTTP server and client setup
//! - `watch_loop`: the `kube-runtime` controller driving reconciliations
//! - `error_policy`: per-resource Fibonacci backoff after failed passes

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
