//! Frontend service configuration.
//!
//! Values resolve field by field: explicit override (CLI flag), then
//! environment variable, then default. Empty environment values count as
//! unset, matching how the deployed demo reads its environment.

use std::env;
use std::net::SocketAddr;

use aviary_common::Result;

/// Environment variable naming the bind address.
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
/// Environment variable naming the backend base URL.
pub const ENV_BACKEND_URL: &str = "BACKEND_URL";
/// Environment variable naming the span collector base URL.
pub const ENV_TRACING_URL: &str = "TRACING_URL";

/// Default bind address for the frontend service.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:6060";
/// Default backend base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:7000";

/// Runtime configuration for the frontend service.
#[derive(Debug, Clone)]
pub struct FrontendConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: String,
    /// Base URL of the backend service, without a trailing slash.
    pub backend_url: String,
    /// Span collector base URL; tracing is disabled when unset.
    pub tracing_url: Option<String>,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            tracing_url: None,
        }
    }
}

impl FrontendConfig {
    /// Builds a config from explicit overrides, the environment, and
    /// defaults, in that order of precedence.
    ///
    /// A trailing slash on the backend URL is dropped so request paths can
    /// be appended directly.
    pub fn resolve(
        bind_addr: Option<String>,
        backend_url: Option<String>,
        tracing_url: Option<String>,
    ) -> Self {
        let defaults = Self::default();
        let bind_addr = bind_addr
            .or_else(|| env_nonempty(ENV_BIND_ADDR))
            .unwrap_or(defaults.bind_addr);
        let backend_url = backend_url
            .or_else(|| env_nonempty(ENV_BACKEND_URL))
            .unwrap_or(defaults.backend_url);
        let backend_url = match backend_url.strip_suffix('/') {
            Some(stripped) => stripped.to_string(),
            None => backend_url,
        };
        let tracing_url = tracing_url.or_else(|| env_nonempty(ENV_TRACING_URL));
        Self {
            bind_addr,
            backend_url,
            tracing_url,
        }
    }

    /// Parses the configured bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(self.bind_addr.parse()?)
    }
}

/// Reads an environment variable, treating empty values as unset.
fn env_nonempty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}
