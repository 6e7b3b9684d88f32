//! Network module with deferred startup lifecycle.
//!
//! `new()` wires the gateway into the hosting pipeline, `start()` binds
//! the TCP listener, and `serve()` accepts connections until shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use remoting_core::EnvelopeCodec;
use tokio::net::TcpListener;
use tracing::info;

use super::config::HostConfig;
use super::handlers::{gateway_handler, health_handler, AppState};
use super::middleware::build_http_layers;
use crate::gateway::Gateway;
use crate::host::build_envelope_pipeline;

/// Serves a [`Gateway`] over HTTP.
///
/// Follows the deferred startup pattern:
/// 1. `new()` -- builds the envelope pipeline around the shared gateway
/// 2. `start()` -- binds the TCP listener to the configured address
/// 3. `serve()` -- accepts connections until shutdown is signalled
///
/// Services may still be registered on the gateway after `start()`; the
/// registry is shared, not copied.
pub struct NetworkModule {
    config: HostConfig,
    gateway: Arc<Gateway>,
    codec: Arc<dyn EnvelopeCodec>,
    listener: Option<TcpListener>,
}

impl NetworkModule {
    /// Create a module serving `gateway` with `codec`. Nothing is bound
    /// until `start()`.
    #[must_use]
    pub fn new(config: HostConfig, gateway: Arc<Gateway>, codec: Arc<dyn EnvelopeCodec>) -> Self {
        Self {
            config,
            gateway,
            codec,
            listener: None,
        }
    }

    /// Shared handle to the gateway, for registering services later.
    #[must_use]
    pub fn gateway(&self) -> Arc<Gateway> {
        Arc::clone(&self.gateway)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `POST {path}` -- envelope endpoint (any other method gets 405)
    /// - `GET /health` -- registered services and uptime
    pub fn build_router(&self) -> Router {
        let state = AppState {
            pipeline: build_envelope_pipeline(Arc::clone(&self.gateway), &self.config),
            codec: Arc::clone(&self.codec),
            gateway: Arc::clone(&self.gateway),
            start_time: Instant::now(),
        };

        Router::new()
            .route(&self.config.path, post(gateway_handler))
            .route("/health", get(health_handler))
            // The body limit is enforced by `RequestBodyLimitLayer` instead.
            .layer(DefaultBodyLimit::disable())
            .layer(build_http_layers(&self.config))
            .with_state(state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which differs from the configured
    /// port when port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first, or if the server
    /// hits a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let router = self.build_router();

        info!(
            path = %self.config.path,
            services = self.gateway.registry().len(),
            "serving gateway"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("gateway stopped");
        Ok(())
    }
}
