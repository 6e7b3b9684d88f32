//! Timeout middleware.
//!
//! Fails envelopes that take longer than the configured deadline with
//! `HostError::Timeout`. The blocking task keeps running to completion;
//! only the response is abandoned.

use std::task::{Context, Poll};
use std::time::Duration;

use remoting_core::{RequestEnvelope, ResponseEnvelope};
use tower::{Layer, Service};

use crate::error::HostError;
use crate::host::HostFuture;

/// Tower layer that fails envelopes running past a deadline.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutLayer {
    timeout: Duration,
}

impl TimeoutLayer {
    /// Create a new `TimeoutLayer` with the given per-envelope deadline.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService {
            inner,
            timeout: self.timeout,
        }
    }
}

/// Service wrapper that enforces a per-envelope deadline.
///
/// On expiry the caller gets `HostError::Timeout`. Work already handed to a
/// blocking thread keeps running to completion.
#[derive(Debug, Clone)]
pub struct TimeoutService<S> {
    inner: S,
    timeout: Duration,
}

impl<S> Service<RequestEnvelope> for TimeoutService<S>
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
        let timeout = self.timeout;
        let fut = self.inner.call(envelope);
        Box::pin(async move {
            match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_elapsed) => Err(HostError::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }),
            }
        })
    }
}
