//! HTTP routes for the frontend service.
//!
//! `GET /shuffle` proxies to the backend; `/` and `/admin` serve the
//! embedded demo pages; `GET /healthz` reports liveness.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use aviary_common::envelope::HealthStatus;
use aviary_common::trace;
use aviary_common::Tracer;

use crate::backend_client::BackendClient;
use crate::{shuffle, ui};

/// Shared state behind the frontend router.
#[derive(Debug)]
pub struct AppState {
    /// Backend base URL, without a trailing slash.
    pub backend_url: String,
    /// Outbound client handle.
    pub client: BackendClient,
    /// Present only when a span collector is configured.
    pub tracer: Option<Arc<Tracer>>,
}

/// Builds the frontend router. The tracing middleware is installed only when
/// the state carries a tracer; static assets are served untraced either way.
pub fn router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/", get(ui::index))
        .route("/admin", get(ui::admin))
        .route("/static/style.css", get(ui::style))
        .route("/shuffle", get(shuffle::shuffle))
        .route("/healthz", get(healthz))
        .layer(CorsLayer::permissive());
    let router = match &state.tracer {
        Some(tracer) => router.layer(axum::middleware::from_fn_with_state(
            tracer.clone(),
            trace::trace_requests,
        )),
        None => router,
    };
    router.with_state(state)
}

async fn healthz() -> Json<HealthStatus> {
    Json(HealthStatus::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state(tracer: Option<Arc<Tracer>>) -> Arc<AppState> {
        Arc::new(AppState {
            backend_url: "http://127.0.0.1:7000".to_string(),
            client: BackendClient::new(),
            tracer,
        })
    }

    #[test]
    fn test_router_builds_with_and_without_tracer() {
        let _ = router(test_state(None));
        let tracer = Arc::new(Tracer::new(
            "frontend",
            "127.0.0.1:6060".parse().unwrap(),
            None,
        ));
        let _ = router(test_state(Some(tracer)));
    }
}
