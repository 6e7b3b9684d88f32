//! Target string → registered service resolution.

use std::sync::Arc;

use tracing::debug;

use crate::error::RequestError;
use crate::registry::ServiceRegistry;
use crate::service::ServiceEntry;

/// Separator between the service name and the method name in a target.
pub const METHOD_SEPARATOR: char = '.';

/// A resolved target: the entry and, optionally, the method to call on it.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub entry: Arc<ServiceEntry>,
    /// `None` calls the service itself.
    pub method: Option<String>,
}

/// Maps message targets onto registry entries.
///
/// A target is tried as a whole service name first, then split on its
/// last `.` into `service.method`. Names containing dots can therefore be
/// registered and addressed directly.
#[derive(Clone, Copy)]
pub struct RequestResolver<'r> {
    registry: &'r ServiceRegistry,
}

impl<'r> RequestResolver<'r> {
    #[must_use]
    pub fn new(registry: &'r ServiceRegistry) -> Self {
        Self { registry }
    }

    /// Resolves `target`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownService` (carrying the original target) when neither
    /// the whole target nor its service part is registered, or when the
    /// method part is empty.
    pub fn resolve(&self, target: &str) -> Result<ResolvedTarget, RequestError> {
        if let Some(entry) = self.registry.get(target) {
            debug!(service_target = target, "resolved to service");
            return Ok(ResolvedTarget {
                entry,
                method: None,
            });
        }

        if let Some((service, method)) = target.rsplit_once(METHOD_SEPARATOR) {
            if !method.is_empty() {
                if let Some(entry) = self.registry.get(service) {
                    debug!(service_target = target, service, method, "resolved to service method");
                    return Ok(ResolvedTarget {
                        entry,
                        method: Some(method.to_string()),
                    });
                }
            }
        }

        debug!(service_target = target, "no service matches target");
        Err(RequestError::UnknownService {
            target: target.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use remoting_core::Value;

    use super::*;
    use crate::registry::ServiceOptions;
    use crate::service::{MethodTable, Service};

    fn registry() -> ServiceRegistry {
        let registry = ServiceRegistry::new();
        registry
            .register(
                Service::object(MethodTable::new("math").method("add", |_| Ok(Value::Null))),
                ServiceOptions::new(),
            )
            .unwrap();
        registry
            .register(
                Service::function("echo", |args| Ok(Value::Array(args))),
                ServiceOptions::new().name("tools.echo"),
            )
            .unwrap();
        registry
    }

    #[test]
    fn exact_name_resolves_without_method() {
        let registry = registry();
        let resolved = RequestResolver::new(&registry).resolve("math").unwrap();
        assert_eq!(resolved.entry.name(), "math");
        assert!(resolved.method.is_none());
    }

    #[test]
    fn dotted_name_registered_whole_wins() {
        let registry = registry();
        let resolved = RequestResolver::new(&registry).resolve("tools.echo").unwrap();
        assert_eq!(resolved.entry.name(), "tools.echo");
        assert!(resolved.method.is_none());
    }

    #[test]
    fn splits_on_last_separator() {
        let registry = registry();
        let resolved = RequestResolver::new(&registry)
            .resolve("tools.echo.upper")
            .unwrap();
        assert_eq!(resolved.entry.name(), "tools.echo");
        assert_eq!(resolved.method.as_deref(), Some("upper"));
    }

    #[test]
    fn method_existence_not_checked_at_resolution() {
        let registry = registry();
        let resolved = RequestResolver::new(&registry)
            .resolve("math.nonexistent")
            .unwrap();
        assert_eq!(resolved.method.as_deref(), Some("nonexistent"));
    }

    #[test]
    fn unknown_target_carries_original_string() {
        let registry = registry();
        let err = RequestResolver::new(&registry)
            .resolve("UnknownThing.run")
            .unwrap_err();
        assert!(matches!(
            err,
            RequestError::UnknownService { target } if target == "UnknownThing.run"
        ));
    }

    #[test]
    fn empty_method_is_unknown_service() {
        let registry = registry();
        assert!(RequestResolver::new(&registry).resolve("math.").is_err());
        assert!(RequestResolver::new(&registry).resolve("").is_err());
    }

    proptest! {
        #[test]
        fn any_method_name_on_registered_service_resolves(method in "[a-zA-Z_][a-zA-Z0-9_]{0,16}") {
            let registry = registry();
            let target = format!("math.{method}");
            let resolved = RequestResolver::new(&registry).resolve(&target).unwrap();
            prop_assert_eq!(resolved.entry.name(), "math");
            prop_assert_eq!(resolved.method.as_deref(), Some(method.as_str()));
        }

        #[test]
        fn unregistered_service_never_resolves(service in "[a-z]{1,8}", method in "[a-z]{1,8}") {
            let registry = registry();
            let target = format!("{service}.{method}");
            prop_assume!(!registry.contains(service.as_str()) && !registry.contains(&target));
            let is_unknown = matches!(
                RequestResolver::new(&registry).resolve(&target),
                Err(RequestError::UnknownService { .. })
            );
            prop_assert!(is_unknown);
        }
    }
}
