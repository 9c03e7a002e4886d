//! Distributed tracing for the demo services.
//!
//! Context propagates between services as a W3C `traceparent` header. There
//! is no global tracer: each service builds a [`Tracer`] handle at startup
//! and injects it into its router state. The [`trace_requests`] middleware
//! opens a SERVER span per request and stashes the request's [`TraceContext`]
//! in the request extensions, where handlers pick it up (via
//! [`CurrentTrace`]) to open child spans around interesting work.
//!
//! Finished spans serialize to Zipkin v2 JSON and are POSTed fire-and-forget
//! to `<collector>/api/v2/spans` when a collector URL is configured;
//! otherwise they are only logged.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace};

/// HTTP header carrying the propagated trace context.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// W3C trace context: 128-bit trace id, 64-bit span id, sampling flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: u128,
    pub span_id: u64,
    pub flags: u8,
}

impl TraceContext {
    /// Creates a new root context with random nonzero ids.
    pub fn new_root() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            trace_id: rng.gen_range(1..u128::MAX),
            span_id: rng.gen_range(1..u64::MAX),
            flags: 0x01,
        }
    }

    /// Creates a child context: same trace id, fresh span id.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id,
            span_id: rand::thread_rng().gen_range(1..u64::MAX),
            flags: self.flags,
        }
    }

    /// Parses a `traceparent` header value.
    ///
    /// Returns `None` for malformed input: wrong field widths, non-hex
    /// characters, the reserved version `ff`, or all-zero ids.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let span_id = parts.next()?;
        let flags = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        if version.len() != 2 || trace_id.len() != 32 || span_id.len() != 16 || flags.len() != 2 {
            return None;
        }
        if u8::from_str_radix(version, 16).ok()? == 0xff {
            return None;
        }
        let trace_id = u128::from_str_radix(trace_id, 16).ok()?;
        let span_id = u64::from_str_radix(span_id, 16).ok()?;
        let flags = u8::from_str_radix(flags, 16).ok()?;
        if trace_id == 0 || span_id == 0 {
            return None;
        }
        Some(Self {
            trace_id,
            span_id,
            flags,
        })
    }
}

impl fmt::Display for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "00-{:032x}-{:016x}-{:02x}",
            self.trace_id, self.span_id, self.flags
        )
    }
}

/// Span kind in Zipkin terms. Absent for plain local spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpanKind {
    Server,
    Client,
}

/// The reporting service, attached to every span record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalEndpoint {
    pub service_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// A finished span in Zipkin v2 JSON shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanRecord {
    pub trace_id: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<SpanKind>,
    /// Microseconds since the Unix epoch.
    pub timestamp: u64,
    /// Microseconds.
    pub duration: u64,
    pub local_endpoint: LocalEndpoint,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Span factory and reporter for one service process.
///
/// Built once at startup with the service name, its bind address and an
/// optional collector base URL, then shared through router state.
#[derive(Debug, Clone)]
pub struct Tracer {
    endpoint: LocalEndpoint,
    collector_url: Option<String>,
}

impl Tracer {
    /// Creates a tracer for `service_name` listening on `addr`.
    ///
    /// With `collector_url` set, finished spans are shipped to
    /// `<collector_url>/api/v2/spans`; without it they are only logged.
    pub fn new(
        service_name: impl Into<String>,
        addr: SocketAddr,
        collector_url: Option<String>,
    ) -> Self {
        let ipv4 = match addr {
            SocketAddr::V4(v4) => Some(v4.ip().to_string()),
            SocketAddr::V6(_) => None,
        };
        Self {
            endpoint: LocalEndpoint {
                service_name: service_name.into(),
                ipv4,
                port: Some(addr.port()),
            },
            collector_url: collector_url.map(|url| url.trim_end_matches('/').to_string()),
        }
    }

    /// Starts a span.
    ///
    /// With a parent, the span joins the parent's trace; without one it
    /// starts a new root trace.
    pub fn span(
        &self,
        name: impl Into<String>,
        kind: Option<SpanKind>,
        parent: Option<&TraceContext>,
    ) -> Span {
        let ctx = match parent {
            Some(parent) => parent.child(),
            None => TraceContext::new_root(),
        };
        Span {
            tracer: self.clone(),
            ctx,
            parent_id: parent.map(|p| p.span_id),
            name: name.into(),
            kind,
            started_wall: SystemTime::now(),
            started: Instant::now(),
            tags: BTreeMap::new(),
        }
    }

    fn report(&self, record: SpanRecord) {
        match &self.collector_url {
            Some(url) => {
                let url = format!("{}/api/v2/spans", url);
                tokio::spawn(send_spans(url, vec![record]));
            }
            None => {
                trace!(
                    span = %record.name,
                    trace_id = %record.trace_id,
                    duration_us = record.duration,
                    "span finished, no collector configured"
                );
            }
        }
    }
}

/// An in-flight span. Finish it to hand the record to the reporter;
/// unfinished spans are silently discarded.
#[derive(Debug)]
pub struct Span {
    tracer: Tracer,
    ctx: TraceContext,
    parent_id: Option<u64>,
    name: String,
    kind: Option<SpanKind>,
    started_wall: SystemTime,
    started: Instant,
    tags: BTreeMap<String, String>,
}

impl Span {
    /// The span's own context, for propagation to children and peers.
    pub fn context(&self) -> TraceContext {
        self.ctx
    }

    /// Attaches a key/value tag.
    pub fn tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    /// Closes the span and reports it.
    pub fn finish(self) {
        let tracer = self.tracer.clone();
        tracer.report(self.into_record());
    }

    fn into_record(self) -> SpanRecord {
        let timestamp = self
            .started_wall
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64;
        SpanRecord {
            trace_id: format!("{:032x}", self.ctx.trace_id),
            id: format!("{:016x}", self.ctx.span_id),
            parent_id: self.parent_id.map(|id| format!("{:016x}", id)),
            name: self.name,
            kind: self.kind,
            timestamp,
            duration: self.started.elapsed().as_micros() as u64,
            local_endpoint: self.tracer.endpoint.clone(),
            tags: self.tags,
        }
    }
}

/// Ships a batch of spans to the collector. Failures are logged, never
/// surfaced; tracing must not affect request handling.
async fn send_spans(url: String, spans: Vec<SpanRecord>) {
    use http_body_util::Full;
    use hyper::body::Bytes;
    use hyper::Request;
    use hyper_util::client::legacy::Client;
    use hyper_util::rt::TokioExecutor;

    let body = match serde_json::to_vec(&spans) {
        Ok(body) => body,
        Err(err) => {
            debug!(%err, "failed to encode span batch");
            return;
        }
    };

    let request = match Request::builder()
        .method("POST")
        .uri(&url)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
    {
        Ok(request) => request,
        Err(err) => {
            debug!(%err, %url, "failed to build span report request");
            return;
        }
    };

    let client = Client::builder(TokioExecutor::new()).build_http();
    match client.request(request).await {
        Ok(response) if !response.status().is_success() => {
            debug!(status = %response.status(), %url, "collector rejected span batch");
        }
        Ok(_) => {}
        Err(err) => {
            debug!(%err, %url, "failed to ship span batch");
        }
    }
}

/// Extractor yielding the request's trace context, when the tracing
/// middleware ran for this request.
#[derive(Debug, Clone, Copy)]
pub struct CurrentTrace(pub Option<TraceContext>);

impl<S> FromRequestParts<S> for CurrentTrace
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentTrace(parts.extensions.get::<TraceContext>().copied()))
    }
}

/// Middleware opening a SERVER span per request.
///
/// Extracts the inbound `traceparent` (absent or malformed starts a new
/// root), tags the usual HTTP attributes, stores the span's context in the
/// request extensions for handlers, and marks non-2xx responses as errors.
/// Static asset requests are not traced.
pub async fn trace_requests(
    State(tracer): State<Arc<Tracer>>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    if path.starts_with("/static") {
        return next.run(req).await;
    }

    let parent = req
        .headers()
        .get(TRACEPARENT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(TraceContext::parse);

    let mut span = tracer.span(&path, Some(SpanKind::Server), parent.as_ref());
    span.tag("http.method", req.method().as_str());
    span.tag("http.url", req.uri().to_string());
    if let Some(host) = req.headers().get(header::HOST).and_then(|v| v.to_str().ok()) {
        span.tag("http.host", host);
    }
    if let Some(agent) = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
    {
        span.tag("http.user_agent", agent);
    }
    if let Some(ConnectInfo(peer)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        span.tag("peer.address", peer.to_string());
    }

    req.extensions_mut().insert(span.context());

    let response = next.run(req).await;

    let status = response.status();
    span.tag("http.status_code", status.as_u16().to_string());
    if !status.is_success() {
        span.tag("error", "true");
    }
    span.finish();

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_context_display_round_trip() {
        let ctx = TraceContext {
            trace_id: 0x4bf92f3577b34da6a3ce929d0e0e4736,
            span_id: 0x00f067aa0ba902b7,
            flags: 0x01,
        };
        let header = ctx.to_string();
        assert_eq!(
            header,
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"
        );
        assert_eq!(TraceContext::parse(&header), Some(ctx));
    }

    #[test]
    fn test_trace_context_parse_rejects_malformed() {
        // Wrong field count.
        assert_eq!(TraceContext::parse("00-abc"), None);
        // Wrong widths.
        assert_eq!(TraceContext::parse("00-abcd-00f067aa0ba902b7-01"), None);
        // Non-hex.
        assert_eq!(
            TraceContext::parse("00-zzf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
            None
        );
        // Reserved version.
        assert_eq!(
            TraceContext::parse("ff-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
            None
        );
        // Zero ids.
        assert_eq!(
            TraceContext::parse("00-00000000000000000000000000000000-00f067aa0ba902b7-01"),
            None
        );
        assert_eq!(
            TraceContext::parse("00-4bf92f3577b34da6a3ce929d0e0e4736-0000000000000000-01"),
            None
        );
        assert_eq!(TraceContext::parse(""), None);
    }

    #[test]
    fn test_trace_context_child_keeps_trace_id() {
        let root = TraceContext::new_root();
        let child = root.child();
        assert_eq!(child.trace_id, root.trace_id);
        assert_eq!(child.flags, root.flags);
        assert_ne!(child.span_id, root.span_id);
    }

    #[test]
    fn test_new_root_ids_nonzero() {
        for _ in 0..32 {
            let ctx = TraceContext::new_root();
            assert_ne!(ctx.trace_id, 0);
            assert_ne!(ctx.span_id, 0);
        }
    }

    fn test_tracer() -> Tracer {
        Tracer::new("backend", "127.0.0.1:7000".parse().unwrap(), None)
    }

    #[test]
    fn test_span_record_json_shape() {
        let tracer = test_tracer();
        let parent = TraceContext::new_root();
        let mut span = tracer.span("call_backend", Some(SpanKind::Client), Some(&parent));
        span.tag("http.method", "GET");
        let ctx = span.context();

        let record = span.into_record();
        assert_eq!(record.parent_id, Some(format!("{:016x}", parent.span_id)));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value.get("kind").unwrap(), "CLIENT");
        assert_eq!(
            value.get("traceId").unwrap(),
            &format!("{:032x}", ctx.trace_id)
        );
        assert_eq!(
            value.get("parentId").unwrap(),
            &format!("{:016x}", parent.span_id)
        );
        assert_eq!(
            value.pointer("/localEndpoint/serviceName").unwrap(),
            "backend"
        );
        assert_eq!(value.pointer("/localEndpoint/ipv4").unwrap(), "127.0.0.1");
        assert_eq!(value.pointer("/tags/http.method").unwrap(), "GET");
        assert!(value.get("timestamp").is_some());
        assert!(value.get("duration").is_some());
    }

    #[test]
    fn test_span_record_omits_absent_fields() {
        let tracer = test_tracer();
        let record = tracer.span("synthetic_delay", None, None).into_record();

        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("kind").is_none());
        assert!(value.get("parentId").is_none());
        assert!(value.get("tags").is_none());
    }

    #[tokio::test]
    async fn test_span_finish_without_collector_is_quiet() {
        let tracer = test_tracer();
        let mut span = tracer.span("/bird", Some(SpanKind::Server), None);
        span.tag("http.status_code", "200");
        span.finish();
    }

    #[tokio::test]
    async fn test_current_trace_extractor_reads_extension() {
        let ctx = TraceContext::new_root();
        let mut req = axum::http::Request::builder().body(()).unwrap();
        req.extensions_mut().insert(ctx);
        let (mut parts, _) = req.into_parts();

        let CurrentTrace(found) = CurrentTrace::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(found, Some(ctx));
    }

    #[tokio::test]
    async fn test_current_trace_extractor_absent_extension() {
        let req = axum::http::Request::builder().body(()).unwrap();
        let (mut parts, _) = req.into_parts();

        let CurrentTrace(found) = CurrentTrace::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(found, None);
    }
}
