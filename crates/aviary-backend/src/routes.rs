//! HTTP routes for the backend service.
//!
//! `GET /bird` serves the next bird in the cycle with caller-controlled
//! fault injection: an optional `delay` (seconds, slept before answering)
//! and an optional `error-rate` (percentage chance of a synthetic 503).
//! `GET /healthz` reports liveness.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use rand::Rng;
use tokio::time::sleep;
use tower_http::cors::CorsLayer;
use tracing::debug;

use aviary_common::envelope::{BirdEnvelope, HealthStatus};
use aviary_common::trace::{self, CurrentTrace, TraceContext};
use aviary_common::{BackendMetadata, Tracer};

use crate::roster::BirdRoster;

/// Shared state behind the backend router.
#[derive(Debug)]
pub struct AppState {
    /// Dataset plus selection cursor.
    pub roster: BirdRoster,
    /// Identity block attached to every reply.
    pub metadata: BackendMetadata,
    /// Present only when a span collector is configured.
    pub tracer: Option<Arc<Tracer>>,
}

/// Builds the backend router. The tracing middleware is installed only when
/// the state carries a tracer.
pub fn router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/bird", get(get_bird))
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

/// Fault-injection knobs, kept as raw strings so parse errors can be
/// reported to the caller verbatim. First value per key wins.
#[derive(Debug, Default, PartialEq, Eq)]
struct BirdParams {
    delay: Option<String>,
    error_rate: Option<String>,
}

impl BirdParams {
    fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut params = BirdParams::default();
        for (key, value) in pairs {
            match key.as_str() {
                "delay" if params.delay.is_none() => params.delay = Some(value.clone()),
                "error-rate" if params.error_rate.is_none() => {
                    params.error_rate = Some(value.clone())
                }
                _ => {}
            }
        }
        params
    }
}

/// Serves the next bird in the cycle.
///
/// Handling order matters: delay first, then the error draw, then selection.
/// A request rejected at either fault-injection stage never advances the
/// selection cursor.
async fn get_bird(
    State(state): State<Arc<AppState>>,
    CurrentTrace(trace): CurrentTrace,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> (StatusCode, Json<BirdEnvelope>) {
    log_headers(&headers);
    let params = BirdParams::from_pairs(&pairs);

    // Delay handling.
    if let Some(delay) = params.delay.as_deref().filter(|d| !d.is_empty() && *d != "0") {
        let seconds: f32 = match delay.parse() {
            Ok(seconds) => seconds,
            Err(err) => {
                debug!(delay, %err, "rejecting unparseable delay");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(BirdEnvelope::error(
                        state.metadata.clone(),
                        format!("error parsing query param \"delay\": {}", err),
                    )),
                );
            }
        };
        synthetic_delay(&state, trace, seconds).await;
    }

    // Error handling.
    if let Some(rate) = params
        .error_rate
        .as_deref()
        .filter(|r| !r.is_empty() && *r != "0")
    {
        let rate: i64 = match rate.parse() {
            Ok(rate) => rate,
            Err(err) => {
                debug!(rate, %err, "rejecting unparseable error-rate");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(BirdEnvelope::error(
                        state.metadata.clone(),
                        format!("error parsing query param \"error-rate\": {}", err),
                    )),
                );
            }
        };
        let draw = rand::thread_rng().gen_range(0..=100);
        if rate >= draw {
            debug!(rate, draw, "injecting synthetic error");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(BirdEnvelope::error(
                    state.metadata.clone(),
                    "randomly generated error",
                )),
            );
        }
    }

    // Pick the next bird in the list.
    let bird = state.roster.next_bird().to_response();
    (
        StatusCode::OK,
        Json(BirdEnvelope::success(state.metadata.clone(), bird)),
    )
}

/// Suspends the current request's task for the requested number of seconds,
/// truncated to whole milliseconds. Non-positive and non-finite values sleep
/// zero. Wrapped in a child span when tracing is active.
async fn synthetic_delay(state: &AppState, trace: Option<TraceContext>, seconds: f32) {
    if !seconds.is_finite() {
        return;
    }
    let millis = (seconds as f64 * 1000.0) as i64;
    if millis <= 0 {
        return;
    }
    let wait = Duration::from_millis(millis as u64);

    match state.tracer.as_ref().zip(trace) {
        Some((tracer, parent)) => {
            let mut span = tracer.span("synthetic_delay", None, Some(&parent));
            span.tag("delay_seconds", seconds.to_string());
            sleep(wait).await;
            span.finish();
        }
        None => sleep(wait).await,
    }
}

/// Logs every request header at debug level, first value per name.
fn log_headers(headers: &HeaderMap) {
    for name in headers.keys() {
        if let Some(value) = headers.get(name) {
            debug!("{}={}", name, String::from_utf8_lossy(value.as_bytes()));
        }
    }
}

async fn healthz() -> Json<HealthStatus> {
    Json(HealthStatus::healthy())
}
