//! Tower middleware layers for the envelope pipeline.
//!
//! - [`timeout`]: Per-envelope deadline
//! - [`metrics`]: Envelope timing and per-status message counts
//! - [`pipeline`]: Composes all layers into a single service stack
//!
//! The concurrency limit is enforced by [`GatewayService`](crate::host::GatewayService),
//! which holds each slot until service code returns.

pub mod metrics;
pub mod pipeline;
pub mod timeout;

pub use metrics::MetricsLayer;
pub use pipeline::{build_envelope_pipeline, EnvelopePipeline};
pub use timeout::TimeoutLayer;
