//! # Controller
//!
//! Core controller modules for the Infra Binding Controller.
//!
//! - `backoff`: Fibonacci backoff mechanism for retries
//! - `reconciler`: Binding engine and backing-type reconcilers
//! - `server`: HTTP server for metrics and health checks

pub mod backoff;
pub mod reconciler;
pub mod server;
