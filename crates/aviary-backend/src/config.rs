//! Backend service configuration.
//!
//! Values resolve field by field: explicit override (CLI flag), then
//! environment variable, then default. Empty environment values count as
//! unset, matching how the deployed demo reads its environment.

use std::env;
use std::net::SocketAddr;

use aviary_common::Result;

use crate::dataset::DatasetVersion;

/// Environment variable naming the bind address.
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
/// Environment variable naming the dataset version.
pub const ENV_VERSION: &str = "VERSION";
/// Environment variable naming the span collector base URL.
pub const ENV_TRACING_URL: &str = "TRACING_URL";

/// Default bind address for the backend service.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:7000";

/// Runtime configuration for the backend service.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: String,
    /// Which embedded dataset to serve.
    pub version: DatasetVersion,
    /// Span collector base URL; tracing is disabled when unset.
    pub tracing_url: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            version: DatasetVersion::default(),
            tracing_url: None,
        }
    }
}

impl BackendConfig {
    /// Builds a config from explicit overrides, the environment, and
    /// defaults, in that order of precedence.
    ///
    /// Fails when the resolved version tag is not `v1` or `v2`.
    pub fn resolve(
        bind_addr: Option<String>,
        version: Option<String>,
        tracing_url: Option<String>,
    ) -> Result<Self> {
        let defaults = Self::default();
        let bind_addr = bind_addr
            .or_else(|| env_nonempty(ENV_BIND_ADDR))
            .unwrap_or(defaults.bind_addr);
        let version = match version.or_else(|| env_nonempty(ENV_VERSION)) {
            Some(tag) => tag.parse()?,
            None => defaults.version,
        };
        let tracing_url = tracing_url.or_else(|| env_nonempty(ENV_TRACING_URL));
        Ok(Self {
            bind_addr,
            version,
            tracing_url,
        })
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
