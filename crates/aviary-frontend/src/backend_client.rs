//! Outbound HTTP client for the backend service.
//!
//! Every request is sent through a freshly built client, so no connection
//! outlives a single exchange. Fault injection between the services (dropped
//! links, rerouted traffic) then shows up on the very next call instead of
//! hiding behind a pooled keep-alive connection.

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use aviary_common::{AviaryError, Result};

/// One-shot GET client for the backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendClient;

impl BackendClient {
    /// Creates a new client handle. The handle holds no connections.
    pub fn new() -> Self {
        Self
    }

    /// Builds a GET request for `url`.
    ///
    /// Fails only when the URL does not parse, which callers surface
    /// separately from transport failures.
    pub fn build_request(&self, url: &str) -> Result<Request<Full<Bytes>>> {
        Request::builder()
            .method("GET")
            .uri(url)
            .body(Full::new(Bytes::new()))
            .map_err(|err| AviaryError::Transport(err.to_string()))
    }

    /// Sends `request` on a fresh connection and returns the response with
    /// the body still unread.
    pub async fn send(&self, request: Request<Full<Bytes>>) -> Result<Response<Incoming>> {
        let client = Client::builder(TokioExecutor::new()).build_http();
        client
            .request(request)
            .await
            .map_err(|err| AviaryError::Transport(err.to_string()))
    }
}
