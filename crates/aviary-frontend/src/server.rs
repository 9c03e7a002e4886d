//! Frontend service assembly and startup.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use aviary_common::{AviaryError, Result, Tracer};

use crate::backend_client::BackendClient;
use crate::config::FrontendConfig;
use crate::routes::{self, AppState};

/// The assembled frontend service. Construction is the fail-fast step;
/// [`FrontendServer::run`] only binds and serves.
pub struct FrontendServer {
    addr: SocketAddr,
    state: Arc<AppState>,
}

impl FrontendServer {
    /// Validates the configuration and assembles the service.
    ///
    /// Fails on an unparseable bind address. The backend URL is taken as-is;
    /// an unreachable or malformed one surfaces per request in the
    /// `/shuffle` envelope rather than at startup.
    pub fn new(config: FrontendConfig) -> Result<Self> {
        let addr = config.socket_addr()?;

        let tracer = config.tracing_url.clone().map(|url| {
            info!("Tracing enabled url={:?}", url);
            Arc::new(Tracer::new("frontend", addr, Some(url)))
        });

        info!("Using backend url={:?}", config.backend_url);

        let state = Arc::new(AppState {
            backend_url: config.backend_url,
            client: BackendClient::new(),
            tracer,
        });

        Ok(Self { addr, state })
    }

    /// Address the server will bind to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Consumes the server, yielding its router. Used by tests and by
    /// [`FrontendServer::run`].
    pub fn into_router(self) -> Router {
        routes::router(self.state)
    }

    /// Binds the listener and serves requests until shutdown.
    pub async fn run(self) -> Result<()> {
        let addr = self.addr;
        let app = self.into_router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| AviaryError::Transport(format!("Failed to bind to {}: {}", addr, err)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|err| AviaryError::Transport(format!("Failed to get local addr: {}", err)))?;

        info!("Starting server listen_addr={:?}", local_addr.to_string());

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(|err| AviaryError::Transport(format!("Server error: {}", err)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_assembles_with_defaults() {
        let server = FrontendServer::new(FrontendConfig::default()).unwrap();
        assert_eq!(server.addr().port(), 6060);
        assert_eq!(server.state.backend_url, "http://localhost:7000");
        assert!(server.state.tracer.is_none());
    }

    #[test]
    fn test_server_rejects_bad_bind_addr() {
        let config = FrontendConfig {
            bind_addr: "definitely not an address".to_string(),
            ..FrontendConfig::default()
        };
        assert!(FrontendServer::new(config).is_err());
    }

    #[test]
    fn test_server_builds_tracer_when_configured() {
        let config = FrontendConfig {
            bind_addr: "127.0.0.1:6060".to_string(),
            tracing_url: Some("http://127.0.0.1:9411".to_string()),
            ..FrontendConfig::default()
        };
        let server = FrontendServer::new(config).unwrap();
        assert!(server.state.tracer.is_some());
    }
}
