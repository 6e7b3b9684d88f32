use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;

use crate::error::RegistryError;
use crate::service::{Authenticator, Service, ServiceEntry};

// ---------------------------------------------------------------------------
// ServiceOptions
// ---------------------------------------------------------------------------

/// Optional settings for a registration.
#[derive(Clone, Default)]
pub struct ServiceOptions {
    name: Option<String>,
    authenticator: Option<Authenticator>,
    description: Option<String>,
}

impl ServiceOptions {
    /// Options that register under the derived name with no authenticator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers under `name` instead of the service's derived name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Checks `(username, password)` before every call to the service.
    #[must_use]
    pub fn authenticator<F>(mut self, check: F) -> Self
    where
        F: Fn(Option<&str>, Option<&str>) -> bool + Send + Sync + 'static,
    {
        self.authenticator = Some(Arc::new(check));
        self
    }

    /// Attaches a description to the entry.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// ---------------------------------------------------------------------------
// ServiceKey
// ---------------------------------------------------------------------------

/// Identifies a registered service for removal or membership tests.
#[derive(Clone, Copy)]
pub enum ServiceKey<'a> {
    /// The registered name.
    Name(&'a str),
    /// An entry previously returned by the registry (matched by identity).
    Entry(&'a Arc<ServiceEntry>),
    /// The service handle that was registered (matched by identity).
    Service(&'a Service),
}

impl<'a> From<&'a str> for ServiceKey<'a> {
    fn from(name: &'a str) -> Self {
        ServiceKey::Name(name)
    }
}

impl<'a> From<&'a String> for ServiceKey<'a> {
    fn from(name: &'a String) -> Self {
        ServiceKey::Name(name)
    }
}

impl<'a> From<&'a Arc<ServiceEntry>> for ServiceKey<'a> {
    fn from(entry: &'a Arc<ServiceEntry>) -> Self {
        ServiceKey::Entry(entry)
    }
}

impl<'a> From<&'a Service> for ServiceKey<'a> {
    fn from(service: &'a Service) -> Self {
        ServiceKey::Service(service)
    }
}

impl fmt::Display for ServiceKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKey::Name(name) => f.write_str(name),
            ServiceKey::Entry(entry) => f.write_str(entry.name()),
            ServiceKey::Service(service) => write!(f, "{service:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceRegistry
// ---------------------------------------------------------------------------

/// Name → service mapping.
///
/// Names are unique. A registration either inserts a new entry or fails
/// without touching existing ones; the duplicate check and the insert
/// happen under the same shard lock. Lookups only take read locks, so the
/// registry can be shared across threads serving requests.
pub struct ServiceRegistry {
    entries: DashMap<String, Arc<ServiceEntry>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Registers `service` and returns the name it was stored under.
    ///
    /// Without an explicit name the service's derived name is used: class
    /// name, function name, object name, or the value's string form.
    ///
    /// # Errors
    ///
    /// - `InvalidService` if `service` is a scalar or otherwise unusable value
    /// - `DuplicateService` if the name is taken
    pub fn register(
        &self,
        service: Service,
        options: ServiceOptions,
    ) -> Result<String, RegistryError> {
        service.validate()?;

        let name = options.name.unwrap_or_else(|| service.default_name());

        match self.entries.entry(name.clone()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateService { name }),
            Entry::Vacant(slot) => {
                info!(service = %name, kind = ?service, "service registered");
                slot.insert(Arc::new(ServiceEntry {
                    name: name.clone(),
                    service,
                    authenticator: options.authenticator,
                    description: options.description,
                }));
                Ok(name)
            }
        }
    }

    /// Removes the first entry matching `key` and returns it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing matches.
    pub fn unregister<'a>(
        &self,
        key: impl Into<ServiceKey<'a>>,
    ) -> Result<Arc<ServiceEntry>, RegistryError> {
        let key = key.into();
        let removed = self
            .find_name(key)
            .and_then(|name| self.entries.remove(&name))
            .map(|(_, entry)| entry);

        match removed {
            Some(entry) => {
                info!(service = %entry.name(), "service unregistered");
                Ok(entry)
            }
            None => Err(RegistryError::NotFound {
                key: key.to_string(),
            }),
        }
    }

    /// Retrieves the entry registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no service has that name.
    pub fn lookup(&self, name: &str) -> Result<Arc<ServiceEntry>, RegistryError> {
        self.get(name).ok_or_else(|| RegistryError::NotFound {
            key: name.to_string(),
        })
    }

    /// Retrieves the entry registered under `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<ServiceEntry>> {
        self.entries.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Membership test by name or by identity.
    pub fn contains<'a>(&self, key: impl Into<ServiceKey<'a>>) -> bool {
        self.find_name(key.into()).is_some()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find_name(&self, key: ServiceKey<'_>) -> Option<String> {
        match key {
            ServiceKey::Name(name) => self.entries.contains_key(name).then(|| name.to_string()),
            ServiceKey::Entry(wanted) => self
                .entries
                .iter()
                .find(|e| Arc::ptr_eq(e.value(), wanted))
                .map(|e| e.key().clone()),
            ServiceKey::Service(wanted) => self
                .entries
                .iter()
                .find(|e| e.value().service().is_same(wanted))
                .map(|e| e.key().clone()),
        }
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
