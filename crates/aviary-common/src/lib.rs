//! Shared building blocks for the aviary demo services.
//!
//! This crate holds everything the backend and frontend services have in
//! common: the JSON envelopes they speak over the wire, the crate-wide error
//! type, duration rendering for response metadata, and the distributed
//! tracing handle with W3C `traceparent` propagation.

pub mod duration;
pub mod envelope;
pub mod error;
pub mod trace;

pub use envelope::{
    BackendMetadata, BirdEnvelope, BirdResponse, HealthStatus, ShuffleEnvelope, ShuffleMetadata,
};
pub use error::{AviaryError, Result};
pub use trace::{SpanKind, TraceContext, Tracer};
