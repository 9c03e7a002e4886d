//! The bird-shuffling frontend service.
//!
//! Serves the demo UI and proxies `/shuffle` requests to the backend,
//! timing each call and reshaping the backend's reply into the frontend
//! envelope. Every backend call rides a fresh connection so network-level
//! fault injection between the services takes effect immediately.

pub mod backend_client;
pub mod config;
pub mod routes;
pub mod server;
mod shuffle;
mod ui;

pub use config::FrontendConfig;
pub use server::FrontendServer;
