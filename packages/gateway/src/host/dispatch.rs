//! Tower adapter around [`Gateway`], including envelope admission.

use std::sync::Arc;
use std::task::{Context, Poll};

use remoting_core::{RequestEnvelope, ResponseEnvelope};
use tokio::sync::Semaphore;
use tower::Service;

use super::HostFuture;
use crate::error::HostError;
use crate::gateway::Gateway;

/// Processes envelopes with a shared [`Gateway`].
///
/// Service code is synchronous, so each envelope runs on tokio's blocking
/// pool. At most `max_concurrent` envelopes run at once; further envelopes
/// are rejected with `HostError::Overloaded` rather than queued.
///
/// The admission permit moves into the blocking task and is released only
/// when `process_envelope` returns. Dropping the returned future (e.g. on a
/// timeout) does not free the slot while service code is still running.
#[derive(Clone)]
pub struct GatewayService {
    gateway: Arc<Gateway>,
    admission: Arc<Semaphore>,
}

impl GatewayService {
    /// Creates a service admitting at most `max_concurrent` envelopes.
    #[must_use]
    pub fn new(gateway: Arc<Gateway>, max_concurrent: usize) -> Self {
        Self {
            gateway,
            admission: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Envelope slots currently free.
    #[must_use]
    pub fn available_slots(&self) -> usize {
        self.admission.available_permits()
    }
}

impl Service<RequestEnvelope> for GatewayService {
    type Response = ResponseEnvelope;
    type Error = HostError;
    type Future = HostFuture<ResponseEnvelope>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, envelope: RequestEnvelope) -> Self::Future {
        let Ok(permit) = Arc::clone(&self.admission).try_acquire_owned() else {
            return Box::pin(async { Err(HostError::Overloaded) });
        };

        let gateway = Arc::clone(&self.gateway);
        Box::pin(async move {
            let reply = tokio::task::spawn_blocking(move || {
                let reply = gateway.process_envelope(&envelope);
                drop(permit);
                reply
            })
            .await?;
            Ok(reply)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use remoting_core::{Message, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::registry::ServiceOptions;
    use crate::service::Service as RemoteService;

    fn single(target: &str) -> RequestEnvelope {
        let mut envelope = RequestEnvelope::new(3, 0);
        envelope.insert("/1", Message::new(target, vec![Value::from("hi")]));
        envelope
    }

    #[tokio::test]
    async fn processes_envelope_on_blocking_pool() {
        let gateway = Gateway::default();
        gateway
            .register_service(
                RemoteService::function("echo", |args| Ok(Value::Array(args))),
                ServiceOptions::new(),
            )
            .unwrap();

        let reply = GatewayService::new(Arc::new(gateway), 4)
            .oneshot(single("echo"))
            .await
            .unwrap();
        assert_eq!(
            reply.get("/1").unwrap().result(),
            Some(&Value::Array(vec![Value::from("hi")]))
        );
    }

    #[tokio::test]
    async fn panicking_service_is_a_fault_not_an_abort() {
        let gateway = Gateway::default();
        gateway
            .register_service(
                RemoteService::function("crash", |_| panic!("service bug")),
                ServiceOptions::new(),
            )
            .unwrap();

        let reply = GatewayService::new(Arc::new(gateway), 4)
            .oneshot(single("crash"))
            .await
            .unwrap();
        assert_eq!(reply.get("/1").unwrap().fault().unwrap().code, "PanicError");
    }

    #[tokio::test]
    async fn aborted_call_holds_slot_until_service_returns() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Arc::new(Mutex::new(release_rx));
        let started = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&started);

        let gateway = Gateway::default();
        gateway
            .register_service(
                RemoteService::function("block", move |_| {
                    flag.store(true, Ordering::SeqCst);
                    let _ = release_rx.lock().recv();
                    Ok(Value::Null)
                }),
                ServiceOptions::new(),
            )
            .unwrap();
        let svc = GatewayService::new(Arc::new(gateway), 1);

        let in_flight = tokio::spawn(svc.clone().oneshot(single("block")));
        while !started.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        in_flight.abort();
        assert!(in_flight.await.is_err());

        let err = svc.clone().oneshot(single("block")).await.unwrap_err();
        assert!(matches!(err, HostError::Overloaded));
        assert_eq!(svc.available_slots(), 0);

        release_tx.send(()).unwrap();
        while svc.available_slots() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        release_tx.send(()).unwrap();
        assert!(svc.clone().oneshot(single("block")).await.is_ok());
    }
}
