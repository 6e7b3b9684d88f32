//! Metrics middleware.
//!
//! Wraps each envelope in a `tracing` span and records the `metrics`
//! counters and histograms below.

use std::task::{Context, Poll};
use std::time::Instant;

use remoting_core::{RequestEnvelope, ResponseEnvelope, Status};
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::error::HostError;
use crate::host::HostFuture;

/// Counter of processed messages, labelled by `status` (`ok` / `error`).
pub const MESSAGES_TOTAL: &str = "remoting_messages_total";
/// Counter of envelopes the hosting layer failed to process, labelled by `reason`.
pub const ENVELOPE_FAILURES_TOTAL: &str = "remoting_envelope_failures_total";
/// Histogram of envelope processing time in seconds.
pub const ENVELOPE_DURATION_SECONDS: &str = "remoting_envelope_duration_seconds";

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that wraps each envelope in a tracing span and records
/// counters and a duration histogram.
#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

/// Service wrapper that records envelope duration and outcome.
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> Service<RequestEnvelope> for MetricsService<S>
where
    S: Service<RequestEnvelope, Response = ResponseEnvelope, Error = HostError> + Send,
    S::Future: Send + 'static,
{
    type Response = ResponseEnvelope;
    type Error = HostError;
    type Future = HostFuture<ResponseEnvelope>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, envelope: RequestEnvelope) -> Self::Future {
        let span = info_span!(
            "envelope",
            amf_version = envelope.amf_version,
            messages = envelope.len(),
            duration_ms = tracing::field::Empty,
            failed = tracing::field::Empty,
        );

        let fut = self.inner.call(envelope);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let elapsed = start.elapsed();

                metrics::histogram!(ENVELOPE_DURATION_SECONDS).record(elapsed.as_secs_f64());

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = elapsed.as_millis() as u64;
                tracing::Span::current().record("duration_ms", duration_ms);

                match &result {
                    Ok(reply) => {
                        let failed = reply
                            .iter()
                            .filter(|(_, response)| response.status == Status::Error)
                            .count();
                        let succeeded = reply.len() - failed;
                        metrics::counter!(MESSAGES_TOTAL, "status" => "ok")
                            .increment(succeeded as u64);
                        metrics::counter!(MESSAGES_TOTAL, "status" => "error")
                            .increment(failed as u64);
                        tracing::Span::current().record("failed", failed);
                        tracing::info!(duration_ms, succeeded, failed, "envelope complete");
                    }
                    Err(err) => {
                        let reason = match err {
                            HostError::Overloaded => "overloaded",
                            HostError::Timeout { .. } => "timeout",
                            HostError::Join(_) => "aborted",
                        };
                        metrics::counter!(ENVELOPE_FAILURES_TOTAL, "reason" => reason).increment(1);
                        tracing::warn!(duration_ms, error = %err, "envelope failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
