//! The bird-serving backend service.
//!
//! Serves one bird fact per request from an embedded dataset, cycling
//! through the records in order, with caller-controlled fault injection
//! (synthetic delay and error rate) for exercising service-mesh and
//! tracing tooling in front of it.

pub mod config;
pub mod dataset;
pub mod roster;
pub mod routes;
pub mod server;

pub use config::BackendConfig;
pub use dataset::DatasetVersion;
pub use server::BackendServer;
