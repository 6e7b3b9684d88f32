//! HTTP handler definitions for the gateway server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports the handler functions used by the router.

pub mod gateway;
pub mod health;

pub use gateway::gateway_handler;
pub use health::health_handler;

use std::sync::Arc;
use std::time::Instant;

use remoting_core::EnvelopeCodec;

use crate::gateway::Gateway;
use crate::host::EnvelopePipeline;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Cloning is cheap: everything is behind an `Arc` or is itself a handle.
#[derive(Clone)]
pub struct AppState {
    /// Hosting pipeline wrapping the gateway.
    pub pipeline: EnvelopePipeline,
    /// Wire codec for request and response bodies.
    pub codec: Arc<dyn EnvelopeCodec>,
    /// The gateway itself, for introspection endpoints.
    pub gateway: Arc<Gateway>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
