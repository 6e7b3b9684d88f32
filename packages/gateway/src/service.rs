//! Registrable service shapes and the per-entry invocation helper.
//!
//! A service is one of:
//! - a named function, called directly with the message body,
//! - a shared object exposing named methods through [`ServiceObject`],
//! - a class: a zero-argument factory producing a fresh object per call,
//! - a plain map value whose keys are non-callable members.
//!
//! Method lookup goes through [`ServiceObject::member`], which answers
//! whether a name is a callable method, a plain field or missing before
//! anything is invoked.

use std::any::type_name;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use remoting_core::Value;

use crate::error::{RegistryError, RequestError};
use crate::failure::ServiceFailure;

/// Method names starting with this marker are never callable remotely.
pub const PRIVATE_PREFIX: char = '_';

/// Result returned by service code.
pub type ServiceResult = Result<Value, ServiceFailure>;

/// A callable taking positional arguments.
pub type ServiceFn = Arc<dyn Fn(Vec<Value>) -> ServiceResult + Send + Sync>;

/// Zero-argument constructor for class services.
pub type Factory = Arc<dyn Fn() -> Box<dyn ServiceObject> + Send + Sync>;

/// Credential check run before invocation. Arguments are `(username, password)`,
/// both absent when the message carries no credentials.
pub type Authenticator = Arc<dyn Fn(Option<&str>, Option<&str>) -> bool + Send + Sync>;

// ---------------------------------------------------------------------------
// ServiceObject
// ---------------------------------------------------------------------------

/// What a name refers to on a service object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member {
    Method,
    /// Exists but cannot be called.
    Field,
    Missing,
}

/// An object exposing named methods to remote callers.
pub trait ServiceObject: Send + Sync {
    /// Name used when the object is registered without an explicit name.
    fn name(&self) -> String {
        short_type_name::<Self>().to_string()
    }

    /// Capability check for `name`.
    fn member(&self, name: &str) -> Member;

    /// Calls the method `name`. Only invoked after `member` returned
    /// [`Member::Method`] for the same name.
    ///
    /// # Errors
    ///
    /// Returns whatever failure the method raises.
    fn call_method(&self, name: &str, args: Vec<Value>) -> ServiceResult;

    /// Calls the object itself. `None` means the object is not callable.
    fn call(&self, _args: Vec<Value>) -> Option<ServiceResult> {
        None
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// ---------------------------------------------------------------------------
// MethodTable
// ---------------------------------------------------------------------------

/// A [`ServiceObject`] assembled from named closures and plain fields.
///
/// Serves as a module-like service object, or as the product of a class
/// factory.
#[derive(Clone, Default)]
pub struct MethodTable {
    name: String,
    methods: HashMap<String, ServiceFn>,
    fields: BTreeMap<String, Value>,
    call: Option<ServiceFn>,
}

impl MethodTable {
    /// An empty table reporting `name` as its object name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a callable method.
    #[must_use]
    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> ServiceResult + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(f));
        self
    }

    /// Adds a plain, non-callable field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Makes the object itself callable.
    #[must_use]
    pub fn callable<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> ServiceResult + Send + Sync + 'static,
    {
        self.call = Some(Arc::new(f));
        self
    }
}

impl ServiceObject for MethodTable {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn member(&self, name: &str) -> Member {
        if self.methods.contains_key(name) {
            Member::Method
        } else if self.fields.contains_key(name) {
            Member::Field
        } else {
            Member::Missing
        }
    }

    fn call_method(&self, name: &str, args: Vec<Value>) -> ServiceResult {
        match self.methods.get(name) {
            Some(method) => method(args),
            None => Err(ServiceFailure::new(
                "AttributeError",
                format!("{} has no method {name}", self.name),
            )),
        }
    }

    fn call(&self, args: Vec<Value>) -> Option<ServiceResult> {
        self.call.as_ref().map(|f| f(args))
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("MethodTable")
            .field("name", &self.name)
            .field("methods", &methods)
            .field("fields", &self.fields)
            .field("callable", &self.call.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// A registrable service.
///
/// Cloning shares the underlying handle, and identity (see [`Service::is_same`])
/// is pointer identity of that handle.
#[derive(Clone)]
pub enum Service {
    Function { name: String, func: ServiceFn },
    Object(Arc<dyn ServiceObject>),
    Class { name: String, factory: Factory },
    Value(Arc<Value>),
}

impl Service {
    /// A named function service.
    pub fn function<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> ServiceResult + Send + Sync + 'static,
    {
        Service::Function {
            name: name.into(),
            func: Arc::new(f),
        }
    }

    /// A shared object service. The same instance serves every call.
    pub fn object<T: ServiceObject + 'static>(object: T) -> Self {
        Service::Object(Arc::new(object))
    }

    /// A class service named after `T`; every call gets `T::default()`.
    #[must_use]
    pub fn class<T: ServiceObject + Default + 'static>() -> Self {
        Service::Class {
            name: short_type_name::<T>().to_string(),
            factory: Arc::new(|| Box::new(T::default()) as Box<dyn ServiceObject>),
        }
    }

    /// A class service with an explicit name and constructor.
    pub fn class_with<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn ServiceObject> + Send + Sync + 'static,
    {
        Service::Class {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    /// A dynamic value offered as a service. Only maps are accepted by the
    /// registry.
    #[must_use]
    pub fn value(value: Value) -> Self {
        Service::Value(Arc::new(value))
    }

    /// Whether `self` and `other` are the same registered service.
    #[must_use]
    pub fn is_same(&self, other: &Service) -> bool {
        match (self, other) {
            (Service::Function { func: a, .. }, Service::Function { func: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            (Service::Object(a), Service::Object(b)) => Arc::ptr_eq(a, b),
            (Service::Class { factory: a, .. }, Service::Class { factory: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            (Service::Value(a), Service::Value(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Name used when registered without an explicit one: class name,
    /// function name, object name, or the value's string form.
    #[must_use]
    pub fn default_name(&self) -> String {
        match self {
            Service::Class { name, .. } | Service::Function { name, .. } => name.clone(),
            Service::Object(object) => object.name(),
            Service::Value(value) => value.to_string(),
        }
    }

    /// Rejects values that cannot act as a service.
    pub(crate) fn validate(&self) -> Result<(), RegistryError> {
        match self {
            Service::Value(value) if value.is_scalar() => Err(RegistryError::InvalidService {
                reason: "service cannot be a scalar value",
            }),
            Service::Value(value) if value.as_map().is_none() => {
                Err(RegistryError::InvalidService {
                    reason: "service must be callable, a module, or an object",
                })
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Function { name, .. } => write!(f, "Function({name})"),
            Service::Object(object) => write!(f, "Object({})", object.name()),
            Service::Class { name, .. } => write!(f, "Class({name})"),
            Service::Value(value) => write!(f, "Value({value})"),
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceEntry
// ---------------------------------------------------------------------------

/// A registered service with its authenticator and description.
pub struct ServiceEntry {
    pub(crate) name: String,
    pub(crate) service: Service,
    pub(crate) authenticator: Option<Authenticator>,
    pub(crate) description: Option<String>,
}

impl ServiceEntry {
    /// Name the service is registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The registered service.
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Free-form description given at registration.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether calls to this service go through an authenticator.
    #[must_use]
    pub fn has_authenticator(&self) -> bool {
        self.authenticator.is_some()
    }

    /// Runs the authenticator, allowing everything when there is none.
    #[must_use]
    pub fn authenticate(&self, username: Option<&str>, password: Option<&str>) -> bool {
        match &self.authenticator {
            Some(check) => check(username, password),
            None => true,
        }
    }

    /// Invokes the service, or its `method`, with positional `args`.
    ///
    /// Class services are instantiated afresh for this call.
    ///
    /// # Errors
    ///
    /// - `InvalidServiceMethod` for private or non-callable methods
    /// - `UnknownServiceMethod` when the method does not exist
    /// - `UnknownService` when `method` is `None` and the service is not callable
    /// - `Application` for failures raised by the service itself
    pub fn invoke(&self, method: Option<&str>, args: Vec<Value>) -> Result<Value, RequestError> {
        if method.is_some_and(|m| m.starts_with(PRIVATE_PREFIX)) {
            return Err(RequestError::InvalidServiceMethod(
                "Calls to private methods are not allowed".to_string(),
            ));
        }

        match &self.service {
            Service::Function { func, .. } => match method {
                None => Ok(func(args)?),
                Some(method) => Err(unknown_method(method)),
            },
            Service::Object(object) => self.dispatch(object.as_ref(), method, args),
            Service::Class { factory, .. } => {
                let instance = factory();
                self.dispatch(instance.as_ref(), method, args)
            }
            Service::Value(value) => match method {
                None => Err(self.not_callable()),
                Some(method) if value.get(method).is_some() => Err(not_callable_method(method)),
                Some(method) => Err(unknown_method(method)),
            },
        }
    }

    fn dispatch(
        &self,
        object: &dyn ServiceObject,
        method: Option<&str>,
        args: Vec<Value>,
    ) -> Result<Value, RequestError> {
        let Some(method) = method else {
            return match object.call(args) {
                Some(result) => Ok(result?),
                None => Err(self.not_callable()),
            };
        };

        match object.member(method) {
            Member::Method => Ok(object.call_method(method, args)?),
            Member::Field => Err(not_callable_method(method)),
            Member::Missing => Err(unknown_method(method)),
        }
    }

    fn not_callable(&self) -> RequestError {
        RequestError::UnknownService {
            target: self.name.clone(),
        }
    }
}

impl fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("name", &self.name)
            .field("service", &self.service)
            .field("authenticator", &self.authenticator.is_some())
            .field("description", &self.description)
            .finish()
    }
}

fn unknown_method(method: &str) -> RequestError {
    RequestError::UnknownServiceMethod {
        method: method.to_string(),
    }
}

fn not_callable_method(method: &str) -> RequestError {
    RequestError::InvalidServiceMethod(format!("Service method {method} must be callable"))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct Calc;

    impl ServiceObject for Calc {
        fn member(&self, name: &str) -> Member {
            match name {
                "add" => Member::Method,
                "precision" => Member::Field,
                _ => Member::Missing,
            }
        }

        fn call_method(&self, _name: &str, args: Vec<Value>) -> ServiceResult {
            Ok(Value::Int(args.iter().filter_map(Value::as_i64).sum()))
        }
    }

    fn entry(service: Service) -> ServiceEntry {
        ServiceEntry {
            name: service.default_name(),
            service,
            authenticator: None,
            description: None,
        }
    }

    #[test]
    fn class_name_is_short_type_name() {
        assert_eq!(Service::class::<Calc>().default_name(), "Calc");
        assert_eq!(Service::object(Calc).default_name(), "Calc");
    }

    #[test]
    fn function_called_directly() {
        let svc = entry(Service::function("echo", |args| Ok(Value::Array(args))));
        let result = svc.invoke(None, vec![Value::from(1)]).unwrap();
        assert_eq!(result, Value::Array(vec![Value::Int(1)]));
    }

    #[test]
    fn function_has_no_methods() {
        let svc = entry(Service::function("echo", |_| Ok(Value::Null)));
        let err = svc.invoke(Some("upper"), vec![]).unwrap_err();
        assert!(matches!(err, RequestError::UnknownServiceMethod { method } if method == "upper"));
    }

    #[test]
    fn object_method_dispatch() {
        let svc = entry(Service::object(Calc));
        let result = svc.invoke(Some("add"), vec![Value::from(2), Value::from(3)]).unwrap();
        assert_eq!(result, Value::Int(5));
    }

    #[test]
    fn field_is_not_callable() {
        let svc = entry(Service::object(Calc));
        let err = svc.invoke(Some("precision"), vec![]).unwrap_err();
        assert!(matches!(
            err,
            RequestError::InvalidServiceMethod(msg) if msg.contains("must be callable")
        ));
    }

    #[test]
    fn private_method_rejected_before_lookup() {
        let looked_up = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&looked_up);
        let svc = entry(Service::class_with("Spy", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::new(MethodTable::new("Spy").method("_secret", |_| Ok(Value::Null)))
        }));

        let err = svc.invoke(Some("_secret"), vec![]).unwrap_err();
        assert!(matches!(err, RequestError::InvalidServiceMethod(_)));
        assert_eq!(looked_up.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn uncallable_object_without_method_is_unknown_service() {
        let svc = entry(Service::object(Calc));
        let err = svc.invoke(None, vec![]).unwrap_err();
        assert!(matches!(err, RequestError::UnknownService { target } if target == "Calc"));
    }

    #[test]
    fn class_instantiated_per_call() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let svc = entry(Service::class_with("Calc", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::new(Calc)
        }));

        svc.invoke(Some("add"), vec![]).unwrap();
        svc.invoke(Some("add"), vec![]).unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn method_table_callable_object() {
        let table = MethodTable::new("greeter").callable(|args| {
            let who = args.first().and_then(Value::as_str).unwrap_or("world");
            Ok(Value::from(format!("hello {who}")))
        });
        let svc = entry(Service::object(table));
        assert_eq!(
            svc.invoke(None, vec![Value::from("bob")]).unwrap(),
            Value::from("hello bob")
        );
    }

    #[test]
    fn map_value_members_are_fields() {
        let value: Value = [("version".to_string(), 2)].into_iter().collect();
        let svc = entry(Service::value(value));

        assert!(matches!(
            svc.invoke(Some("version"), vec![]).unwrap_err(),
            RequestError::InvalidServiceMethod(_)
        ));
        assert!(matches!(
            svc.invoke(Some("other"), vec![]).unwrap_err(),
            RequestError::UnknownServiceMethod { .. }
        ));
        assert!(matches!(
            svc.invoke(None, vec![]).unwrap_err(),
            RequestError::UnknownService { .. }
        ));
    }

    #[test]
    fn scalar_values_rejected() {
        assert!(matches!(
            Service::value(Value::from("svc")).validate(),
            Err(RegistryError::InvalidService { reason }) if reason.contains("scalar")
        ));
        assert!(matches!(
            Service::value(Value::Array(vec![])).validate(),
            Err(RegistryError::InvalidService { reason }) if reason.contains("callable")
        ));
        assert!(Service::value(Value::Map(BTreeMap::new())).validate().is_ok());
    }

    #[test]
    fn identity_is_pointer_based() {
        let a = Service::class::<Calc>();
        let b = Service::class::<Calc>();
        assert!(a.is_same(&a.clone()));
        assert!(!a.is_same(&b));
    }

    #[test]
    fn application_failure_propagates() {
        let svc = entry(Service::function("boom", |_| {
            Err(ServiceFailure::new("ValueError", "bad input"))
        }));
        let err = svc.invoke(None, vec![]).unwrap_err();
        assert!(matches!(err, RequestError::Application(f) if f.kind() == "ValueError"));
    }
}
