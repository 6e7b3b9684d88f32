//! Hosting layer: runs the synchronous gateway behind a tower service stack.
//!
//! 1. **Dispatch** (`dispatch`): admission, then `RequestEnvelope` -> `ResponseEnvelope`
//!    on a blocking thread
//! 2. **Middleware** (`middleware`): timeouts, metrics
//!
//! The gateway itself has no timeout or concurrency policy; both live here.

pub mod dispatch;
pub mod middleware;

use std::future::Future;
use std::pin::Pin;

use crate::error::HostError;

pub use dispatch::GatewayService;
pub use middleware::{build_envelope_pipeline, EnvelopePipeline};

/// Boxed future returned by every service in the hosting stack.
pub type HostFuture<T> = Pin<Box<dyn Future<Output = Result<T, HostError>> + Send>>;
