//! HTTP API Module
//!
//! Serves the discovery document, the reachability probe and
//! monitoring endpoints.

mod metrics;
mod routes;

pub use metrics::Metrics;
pub use routes::run_api_server;
