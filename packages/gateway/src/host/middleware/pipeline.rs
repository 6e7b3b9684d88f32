//! Pipeline composition: combines all middleware layers into a single service stack.

use std::sync::Arc;

use tower::ServiceBuilder;

use super::metrics::{MetricsLayer, MetricsService};
use super::timeout::{TimeoutLayer, TimeoutService};
use crate::gateway::Gateway;
use crate::host::dispatch::GatewayService;
use crate::network::HostConfig;

/// The composed envelope service produced by [`build_envelope_pipeline`].
pub type EnvelopePipeline = TimeoutService<MetricsService<GatewayService>>;

/// Wraps the gateway with the hosting middleware.
///
/// Layer order (outermost to innermost):
/// 1. `TimeoutLayer` -- bound envelope latency
/// 2. `MetricsLayer` -- record timing and outcome, including rejections
/// 3. `GatewayService` -- admission (`max_concurrent_envelopes`) and dispatch
///
/// A timed-out envelope keeps its admission slot until its service call
/// actually finishes.
#[must_use]
pub fn build_envelope_pipeline(gateway: Arc<Gateway>, config: &HostConfig) -> EnvelopePipeline {
    ServiceBuilder::new()
        .layer(TimeoutLayer::new(config.envelope_timeout))
        .layer(MetricsLayer)
        .service(GatewayService::new(gateway, config.max_concurrent_envelopes))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use remoting_core::{Message, RequestEnvelope, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::error::HostError;
    use crate::registry::ServiceOptions;
    use crate::service::Service;

    fn single(target: &str) -> RequestEnvelope {
        let mut envelope = RequestEnvelope::new(3, 0);
        envelope.insert("/1", Message::new(target, vec![]));
        envelope
    }

    #[tokio::test]
    async fn pipeline_routes_through_all_layers() {
        let gateway = Gateway::default();
        gateway
            .register_service(
                Service::function("double", |args| {
                    Ok(Value::Int(args.first().and_then(Value::as_i64).unwrap_or(0) * 2))
                }),
                ServiceOptions::new(),
            )
            .unwrap();

        let config = HostConfig {
            max_concurrent_envelopes: 4,
            ..HostConfig::default()
        };
        let svc = build_envelope_pipeline(Arc::new(gateway), &config);

        let mut envelope = RequestEnvelope::new(3, 2);
        envelope.insert("/1", Message::new("double", vec![Value::from(21)]));
        envelope.insert("/2", Message::new("missing", vec![]));

        let reply = svc.oneshot(envelope).await.unwrap();
        assert_eq!(reply.client_type, 2);
        assert_eq!(reply.get("/1").unwrap().result(), Some(&Value::Int(42)));
        assert!(!reply.get("/2").unwrap().is_ok());
    }

    #[tokio::test]
    async fn concurrency_limit_survives_timeouts() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));
        let (now, max, done) = (
            Arc::clone(&running),
            Arc::clone(&peak),
            Arc::clone(&completed),
        );

        let gateway = Gateway::default();
        gateway
            .register_service(
                Service::function("slow", move |_| {
                    let current = now.fetch_add(1, Ordering::SeqCst) + 1;
                    max.fetch_max(current, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(200));
                    now.fetch_sub(1, Ordering::SeqCst);
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Null)
                }),
                ServiceOptions::new(),
            )
            .unwrap();

        let config = HostConfig {
            max_concurrent_envelopes: 1,
            envelope_timeout: Duration::from_millis(20),
            ..HostConfig::default()
        };
        let svc = build_envelope_pipeline(Arc::new(gateway), &config);

        let first = svc.clone().oneshot(single("slow")).await;
        assert!(matches!(first, Err(HostError::Timeout { timeout_ms: 20 })));

        for _ in 0..4 {
            let next = svc.clone().oneshot(single("slow")).await;
            assert!(matches!(next, Err(HostError::Overloaded)));
        }

        // The slot frees up once the first call returns.
        let retry = loop {
            match svc.clone().oneshot(single("slow")).await {
                Err(HostError::Overloaded) => tokio::time::sleep(Duration::from_millis(10)).await,
                other => break other,
            }
        };
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert!(matches!(retry, Err(HostError::Timeout { .. })));

        while completed.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
