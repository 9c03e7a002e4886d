//! The `/shuffle` proxy handler.
//!
//! Proxies one bird request to the backend, measures how long the exchange
//! took, and reshapes the backend envelope into the frontend's own reply.
//! Backend failures of any kind are reported inside a 200 body so the demo
//! UI always has JSON to render; the only non-200 reply is a 503 when the
//! outbound request cannot even be constructed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use http_body_util::BodyExt;
use hyper::header::{self, HeaderValue};
use tracing::warn;

use aviary_common::duration::{format_duration, round_duration};
use aviary_common::envelope::{BirdEnvelope, ShuffleEnvelope, ShuffleMetadata};
use aviary_common::trace::{CurrentTrace, SpanKind, TRACEPARENT_HEADER};

use crate::routes::AppState;

/// Proxies one request to the backend `/bird` endpoint.
///
/// The call is timed from just before the request is built to just after a
/// response (or failure) comes back; body reading and decoding happen after
/// the clock stops. Caller query params are forwarded so fault-injection
/// knobs pass straight through to the backend.
pub(crate) async fn shuffle(
    State(state): State<Arc<AppState>>,
    CurrentTrace(trace): CurrentTrace,
    Query(pairs): Query<Vec<(String, String)>>,
) -> (StatusCode, Json<ShuffleEnvelope>) {
    let started = Instant::now();

    let url = bird_url(&state.backend_url, &pairs);
    let mut request = match state.client.build_request(&url) {
        Ok(request) => request,
        Err(err) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ShuffleEnvelope::error(
                    String::new(),
                    format!("Unable to construct request: {}", err),
                )),
            );
        }
    };

    // Client span around the backend call, propagated via traceparent.
    let span = match state.tracer.as_ref().zip(trace) {
        Some((tracer, parent)) => {
            let mut span = tracer.span("call_backend", Some(SpanKind::Client), Some(&parent));
            span.tag("http.url", url.as_str());
            span.tag("http.method", "GET");
            if let Ok(value) = HeaderValue::from_str(&span.context().to_string()) {
                request.headers_mut().insert(TRACEPARENT_HEADER, value);
            }
            Some(span)
        }
        None => None,
    };

    let result = state.client.send(request).await;
    let duration = format_duration(round_duration(started.elapsed()));

    if let Some(mut span) = span {
        match &result {
            Ok(response) => {
                span.tag("http.status_code", response.status().as_u16().to_string());
                if !response.status().is_success() {
                    span.tag("error", "true");
                }
            }
            Err(_) => span.tag("error", "true"),
        }
        span.finish();
    }

    let response = match result {
        Ok(response) => response,
        Err(err) => {
            return backend_error(duration, format!("unable to call backend: {}", err));
        }
    };

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let body = match response.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            return backend_error(
                duration,
                format!("unable to read backend response body: {}", err),
            );
        }
    };

    // A reply without a JSON content type never came from the backend
    // handler itself; show the raw body to aid debugging.
    if !content_type.contains("application/json") {
        return backend_error(
            duration,
            format!(
                "received status code {} from backend: {:?}",
                status.as_u16(),
                String::from_utf8_lossy(&body)
            ),
        );
    }

    let backend: BirdEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            return backend_error(duration, format!("json unmarshalling response body: {}", err));
        }
    };

    let metadata = ShuffleMetadata {
        backend_duration: duration,
        backend_status_code: Some(status.as_u16()),
        backend_hostname: nonempty(backend.metadata.hostname),
        backend_version: nonempty(backend.metadata.version),
    };

    // A JSON reply with a non-200 status is the backend's own error
    // envelope (fault injection, bad params); relay its message.
    if status != StatusCode::OK {
        return (
            StatusCode::OK,
            Json(ShuffleEnvelope {
                metadata,
                error: Some(format!(
                    "received status code {} from backend: {:?}",
                    status.as_u16(),
                    backend.error.unwrap_or_default()
                )),
                response: None,
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ShuffleEnvelope {
            metadata,
            error: None,
            response: Some(backend.response.unwrap_or_default()),
        }),
    )
}

/// Builds the backend `/bird` URL, forwarding the caller's query params.
/// First value per key wins and the query is re-encoded with sorted keys.
fn bird_url(backend_url: &str, pairs: &[(String, String)]) -> String {
    let mut params: BTreeMap<&str, &str> = BTreeMap::new();
    for (key, value) in pairs {
        params.entry(key.as_str()).or_insert(value.as_str());
    }
    if params.is_empty() {
        return format!("{}/bird", backend_url);
    }
    let query = serde_urlencoded::to_string(&params).unwrap_or_default();
    format!("{}/bird?{}", backend_url, query)
}

/// An empty backend identity field counts as unset and drops out of the
/// serialized metadata.
fn nonempty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Renders a backend-call failure: logged, then returned inside a 200 so
/// the UI still gets a well-formed envelope.
fn backend_error(duration: String, message: String) -> (StatusCode, Json<ShuffleEnvelope>) {
    warn!("Error calling backend: {}", message);
    (
        StatusCode::OK,
        Json(ShuffleEnvelope::error(duration, message)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_bird_url_without_params() {
        assert_eq!(
            bird_url("http://localhost:7000", &[]),
            "http://localhost:7000/bird"
        );
    }

    #[test]
    fn test_bird_url_sorts_keys_and_keeps_first_value() {
        let url = bird_url(
            "http://backend:7000",
            &pairs(&[("delay", "1.5"), ("b", "2"), ("a", "1"), ("a", "9")]),
        );
        assert_eq!(url, "http://backend:7000/bird?a=1&b=2&delay=1.5");
    }

    #[test]
    fn test_bird_url_escapes_values() {
        let url = bird_url("http://backend:7000", &pairs(&[("delay", "not a number")]));
        assert_eq!(url, "http://backend:7000/bird?delay=not+a+number");
    }

    #[test]
    fn test_nonempty_drops_empty_identity() {
        assert_eq!(nonempty("bk-1".to_string()), Some("bk-1".to_string()));
        assert_eq!(nonempty(String::new()), None);
    }

    #[test]
    fn test_backend_error_wraps_in_ok_envelope() {
        let (status, Json(envelope)) =
            backend_error("12µs".to_string(), "unable to call backend: x".to_string());
        assert_eq!(status, StatusCode::OK);
        assert_eq!(envelope.metadata.backend_duration, "12µs");
        assert_eq!(envelope.error.as_deref(), Some("unable to call backend: x"));
        assert!(envelope.response.is_none());
    }
}
