//! A message bound to the service that will handle it.

use std::sync::Arc;

use remoting_core::{Envelope, Value};

use crate::error::RequestError;
use crate::resolver::ResolvedTarget;
use crate::service::ServiceEntry;

/// Envelope-level metadata a request was received with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestMeta {
    pub amf_version: u16,
    pub client_type: u16,
}

impl RequestMeta {
    #[must_use]
    pub fn of<T>(envelope: &Envelope<T>) -> Self {
        Self {
            amf_version: envelope.amf_version,
            client_type: envelope.client_type,
        }
    }
}

/// A resolved, callable unit of work.
#[derive(Debug, Clone)]
pub struct BoundRequest {
    meta: RequestMeta,
    entry: Arc<ServiceEntry>,
    method: Option<String>,
}

impl BoundRequest {
    #[must_use]
    pub fn new(meta: RequestMeta, target: ResolvedTarget) -> Self {
        Self {
            meta,
            entry: target.entry,
            method: target.method,
        }
    }

    #[must_use]
    pub fn meta(&self) -> RequestMeta {
        self.meta
    }

    #[must_use]
    pub fn entry(&self) -> &Arc<ServiceEntry> {
        &self.entry
    }

    /// `None` when the service itself is called.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Checks credentials with the service's authenticator. Services without
    /// one accept any caller.
    #[must_use]
    pub fn authenticate(&self, username: Option<&str>, password: Option<&str>) -> bool {
        self.entry.authenticate(username, password)
    }

    /// Calls the bound service with `args` as positional arguments.
    ///
    /// # Errors
    ///
    /// See [`ServiceEntry::invoke`].
    pub fn invoke(&self, args: Vec<Value>) -> Result<Value, RequestError> {
        self.entry.invoke(self.method(), args)
    }
}
