//! Backend service assembly and startup.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use aviary_common::{AviaryError, BackendMetadata, Result, Tracer};

use crate::config::BackendConfig;
use crate::dataset;
use crate::roster::BirdRoster;
use crate::routes::{self, AppState};

/// The assembled backend service: configuration validated, dataset loaded,
/// hostname resolved, tracer built. Construction is the fail-fast step;
/// [`BackendServer::run`] only binds and serves.
pub struct BackendServer {
    addr: SocketAddr,
    state: Arc<AppState>,
}

impl BackendServer {
    /// Validates the configuration and assembles the service.
    ///
    /// Fails on an unparseable bind address or a corrupt/empty dataset.
    /// Hostname resolution failure is not fatal: the error text stands in
    /// for the hostname so the demo surfaces it in response metadata.
    pub fn new(config: BackendConfig) -> Result<Self> {
        let addr = config.socket_addr()?;
        let records = dataset::load(config.version)?;

        let hostname = match hostname::get() {
            Ok(name) => name.to_string_lossy().into_owned(),
            Err(err) => err.to_string(),
        };

        let tracer = config
            .tracing_url
            .clone()
            .map(|url| {
                info!("Tracing enabled url={:?}", url);
                Arc::new(Tracer::new("backend", addr, Some(url)))
            });

        let state = Arc::new(AppState {
            roster: BirdRoster::new(records),
            metadata: BackendMetadata::new(hostname, config.version.as_str()),
            tracer,
        });

        Ok(Self { addr, state })
    }

    /// Address the server will bind to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Consumes the server, yielding its router. Used by tests and by
    /// [`BackendServer::run`].
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
