//! Error kinds raised by the registry, the request pipeline and the hosting layer.
//!
//! Request-time kinds know their fault code through [`Faultable`]; there is no global
//! table mapping error types to codes.

use axum::http::StatusCode;

use crate::failure::ServiceFailure;
use crate::fault::Faultable;

/// Stable fault codes for resolution failures.
pub mod codes {
    pub const RESOURCE_NOT_FOUND: &str = "Service.ResourceNotFound";
    pub const METHOD_NOT_FOUND: &str = "Service.MethodNotFound";
    pub const METHOD_INVALID: &str = "Service.MethodInvalid";
    pub const AUTHENTICATION: &str = "AuthenticationError";
}

// ---------------------------------------------------------------------------
// RegistryError
// ---------------------------------------------------------------------------

/// Configuration-time failures from registering or removing services.
///
/// Returned straight to the caller of the registry; they never become faults.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Service {name} already exists")]
    DuplicateService { name: String },
    #[error("{reason}")]
    InvalidService { reason: &'static str },
    #[error("Service {key} not found")]
    NotFound { key: String },
}

// ---------------------------------------------------------------------------
// RequestError
// ---------------------------------------------------------------------------

/// Request-time failures. The gateway turns every one of these into a fault.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("Unknown service {target}")]
    UnknownService { target: String },
    #[error("Unknown method {method}")]
    UnknownServiceMethod { method: String },
    #[error("{0}")]
    InvalidServiceMethod(String),
    #[error("{0}")]
    Remoting(String),
    #[error("{0}")]
    NotImplemented(&'static str),
    #[error(transparent)]
    Application(#[from] ServiceFailure),
}

impl Faultable for RequestError {
    fn kind_name(&self) -> &str {
        match self {
            RequestError::UnknownService { .. } => "UnknownServiceError",
            RequestError::UnknownServiceMethod { .. } => "UnknownServiceMethodError",
            RequestError::InvalidServiceMethod(_) => "InvalidServiceMethodError",
            RequestError::Remoting(_) => "RemotingError",
            RequestError::NotImplemented(_) => "NotImplementedError",
            RequestError::Application(failure) => failure.kind(),
        }
    }

    fn stable_code(&self) -> Option<&str> {
        match self {
            RequestError::UnknownService { .. } => Some(codes::RESOURCE_NOT_FOUND),
            RequestError::UnknownServiceMethod { .. } => Some(codes::METHOD_NOT_FOUND),
            RequestError::InvalidServiceMethod(_) => Some(codes::METHOD_INVALID),
            RequestError::Application(failure) => failure.code(),
            _ => None,
        }
    }

    fn origin(&self) -> Option<&std::backtrace::Backtrace> {
        match self {
            RequestError::Application(failure) => Some(failure.backtrace()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// HostError
// ---------------------------------------------------------------------------

/// Transport-level failures of the hosting pipeline. These never reach a
/// response envelope; the HTTP adapter maps them to status codes.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("gateway overloaded, try again later")]
    Overloaded,
    #[error("envelope processing timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("envelope processing aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl HostError {
    /// HTTP status reported for this failure.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            HostError::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
            HostError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            HostError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
