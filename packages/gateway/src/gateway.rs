//! The per-message dispatch pipeline.
//!
//! Each message runs through:
//!
//! 1. **Describe check**: introspection requests are not supported
//! 2. **Resolve**: target → service entry (+ method)
//! 3. **Authenticate**: credentials header → authenticator
//! 4. **Authorization gate**: rejected credentials end the request
//! 5. **Invoke**: call the service with the message body
//!
//! Every request-time failure becomes an `ERROR` response carrying a fault;
//! nothing in here returns an error to the caller of
//! [`Gateway::process_envelope`]. A panic in an authenticator or in service
//! code counts as such a failure and only affects its own message.

use std::panic::{self, AssertUnwindSafe};

use remoting_core::{
    Message, RequestEnvelope, Response, ResponseEnvelope, Value, CREDENTIALS_HEADER,
};
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::{RegistryError, RequestError};
use crate::failure::ServiceFailure;
use crate::fault::FaultTranslator;
use crate::registry::{ServiceKey, ServiceOptions, ServiceRegistry};
use crate::request::{BoundRequest, RequestMeta};
use crate::resolver::RequestResolver;
use crate::service::{Service, ServiceEntry};

/// How a message should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processor {
    /// Run the regular resolve/authenticate/invoke pipeline.
    Request,
    /// Service introspection, which this gateway does not implement.
    NotImplemented,
}

/// Remoting gateway: owns the service registry and processes envelopes.
pub struct Gateway {
    registry: ServiceRegistry,
    faults: FaultTranslator,
}

impl Gateway {
    /// Create a gateway with an empty registry.
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            registry: ServiceRegistry::new(),
            faults: FaultTranslator::new(config.expose_fault_details),
        }
    }

    /// Creates a gateway with an initial set of named services.
    ///
    /// # Errors
    ///
    /// Fails on the first service the registry rejects.
    pub fn with_services<I, N>(config: GatewayConfig, services: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (N, Service)>,
        N: Into<String>,
    {
        let gateway = Self::new(config);
        for (name, service) in services {
            gateway.register_service(service, ServiceOptions::new().name(name))?;
        }
        Ok(gateway)
    }

    /// The registry backing this gateway.
    #[must_use]
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Adds a service. See [`ServiceRegistry::register`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidService` or `DuplicateService`.
    pub fn register_service(
        &self,
        service: Service,
        options: ServiceOptions,
    ) -> Result<String, RegistryError> {
        self.registry.register(service, options)
    }

    /// Removes a service by name, entry or handle.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing matches.
    pub fn unregister_service<'a>(
        &self,
        key: impl Into<ServiceKey<'a>>,
    ) -> Result<std::sync::Arc<ServiceEntry>, RegistryError> {
        self.registry.unregister(key)
    }

    /// Resolves `message` to a bound request.
    ///
    /// # Errors
    ///
    /// Returns `UnknownService` when the target matches no service.
    pub fn get_service_request(
        &self,
        message: &Message,
        meta: RequestMeta,
    ) -> Result<BoundRequest, RequestError> {
        let resolved = RequestResolver::new(&self.registry).resolve(&message.target)?;
        Ok(BoundRequest::new(meta, resolved))
    }

    /// Picks the processor for `message`. Transports can use this to
    /// special-case introspection requests.
    #[must_use]
    pub fn get_processor(&self, message: &Message) -> Processor {
        if message.is_describe_request() {
            Processor::NotImplemented
        } else {
            Processor::Request
        }
    }

    /// Runs the request's authenticator against the message credentials.
    ///
    /// # Errors
    ///
    /// Returns `Remoting` if the credentials header is not a map holding both
    /// `userid` and `password`.
    pub fn authenticate_request(
        &self,
        request: &BoundRequest,
        message: &Message,
    ) -> Result<bool, RequestError> {
        let Some(credentials) = message.header(CREDENTIALS_HEADER) else {
            return Ok(request.authenticate(None, None));
        };

        let (Some(userid), Some(password)) =
            (credentials.get("userid"), credentials.get("password"))
        else {
            return Err(invalid_credentials());
        };

        Ok(request.authenticate(credential_str(userid)?, credential_str(password)?))
    }

    /// Processes one message into a response.
    #[must_use]
    pub fn process_request(&self, message: &Message, meta: RequestMeta) -> Response {
        let request = match self.get_service_request(message, meta) {
            Ok(request) => request,
            Err(err) => return self.fail(message, &err),
        };

        match guarded(|| self.authenticate_request(&request, message)) {
            Ok(true) => {}
            Ok(false) => {
                warn!(service_target = %message.target, "authentication failed");
                return Response::error(FaultTranslator::authentication_failed());
            }
            Err(err) => return self.fail(message, &err),
        }

        match guarded(|| request.invoke(message.body.clone())) {
            Ok(value) => {
                debug!(service_target = %message.target, "request succeeded");
                Response::ok(value)
            }
            Err(err) => self.fail(message, &err),
        }
    }

    /// Processes every message of `envelope`, storing each response under
    /// the message's name. Version and client type are echoed unchanged.
    #[must_use]
    pub fn process_envelope(&self, envelope: &RequestEnvelope) -> ResponseEnvelope {
        let meta = RequestMeta::of(envelope);
        let mut reply = ResponseEnvelope::reply_to(envelope);

        for (name, message) in envelope.iter() {
            let response = match self.get_processor(message) {
                Processor::Request => self.process_request(message, meta),
                Processor::NotImplemented => self.fail(
                    message,
                    &RequestError::NotImplemented("Service description is not supported"),
                ),
            };
            reply.insert(name, response);
        }

        reply
    }

    fn fail(&self, message: &Message, err: &RequestError) -> Response {
        let fault = self.faults.translate(err);
        warn!(service_target = %message.target, code = %fault.code, "request failed: {err}");
        Response::error(fault)
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new(GatewayConfig::default())
    }
}

/// Runs a step that calls into user code, turning a panic into an
/// application failure.
fn guarded<T>(step: impl FnOnce() -> Result<T, RequestError>) -> Result<T, RequestError> {
    panic::catch_unwind(AssertUnwindSafe(step))
        .unwrap_or_else(|payload| Err(ServiceFailure::from_panic(payload.as_ref()).into()))
}

fn invalid_credentials() -> RequestError {
    RequestError::Remoting("Invalid credentials object".to_string())
}

/// Credential fields may be strings or null.
fn credential_str(value: &Value) -> Result<Option<&str>, RequestError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        _ => Err(invalid_credentials()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
