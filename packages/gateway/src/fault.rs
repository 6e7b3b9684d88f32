//! Failure → [`Fault`] translation.

use std::backtrace::{Backtrace, BacktraceStatus};

use remoting_core::Fault;

use crate::error::codes;

/// An error that can be reported to a remote caller as a fault.
///
/// The fault code is the declared stable code when there is one, otherwise
/// the kind name.
pub trait Faultable: std::error::Error {
    /// Name of the failure kind, e.g. `UnknownServiceError` or `ValueError`.
    fn kind_name(&self) -> &str;

    /// Protocol-level code that replaces the kind name in faults.
    fn stable_code(&self) -> Option<&str> {
        None
    }

    /// Where the failure was raised, if it was captured.
    fn origin(&self) -> Option<&Backtrace> {
        None
    }
}

/// Builds faults from failures.
///
/// Holds no state besides its settings, so concurrent translations of
/// unrelated failures are independent.
#[derive(Debug, Clone, Copy)]
pub struct FaultTranslator {
    include_details: bool,
}

impl FaultTranslator {
    /// Create a translator. With `include_details` off, faults carry no
    /// origin lines.
    #[must_use]
    pub fn new(include_details: bool) -> Self {
        Self { include_details }
    }

    /// Translates `err` into a fault.
    pub fn translate(&self, err: &dyn Faultable) -> Fault {
        let code = err.stable_code().unwrap_or_else(|| err.kind_name());
        let fault = Fault::new(code, err.to_string());
        if self.include_details {
            fault.with_details(format_origin(err))
        } else {
            fault
        }
    }

    /// The fault returned when an authenticator rejects the credentials.
    #[must_use]
    pub fn authentication_failed() -> Fault {
        Fault::new(codes::AUTHENTICATION, "Authentication failed")
    }
}

impl Default for FaultTranslator {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Formats the error chain, followed by the captured backtrace if any.
fn format_origin(err: &dyn Faultable) -> Vec<String> {
    let mut lines = vec![format!("{}: {}", err.kind_name(), err)];

    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {cause}"));
        source = cause.source();
    }

    if let Some(backtrace) = err.origin() {
        if backtrace.status() == BacktraceStatus::Captured {
            lines.extend(backtrace.to_string().lines().map(str::to_owned));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;
    use crate::failure::ServiceFailure;

    #[test]
    fn code_falls_back_to_kind_name() {
        let err = RequestError::from(ServiceFailure::new("ValueError", "bad input"));
        let fault = FaultTranslator::new(false).translate(&err);

        assert_eq!(fault.code, "ValueError");
        assert_eq!(fault.description, "bad input");
        assert!(fault.details.is_empty());
    }

    #[test]
    fn declared_code_wins_over_kind() {
        let err = RequestError::from(
            ServiceFailure::new("ValueError", "bad input").with_code("App.BadInput"),
        );
        let fault = FaultTranslator::default().translate(&err);
        assert_eq!(fault.code, "App.BadInput");
    }

    #[test]
    fn details_include_cause_chain() {
        let io = std::io::Error::other("disk full");
        let err = RequestError::from(ServiceFailure::new("IOError", "save failed").with_source(io));
        let fault = FaultTranslator::default().translate(&err);

        assert_eq!(fault.details[0], "IOError: save failed");
        assert_eq!(fault.details[1], "caused by: disk full");
    }

    #[test]
    fn resolution_error_uses_stable_code() {
        let err = RequestError::UnknownService {
            target: "Nope".to_string(),
        };
        let fault = FaultTranslator::default().translate(&err);
        assert_eq!(fault.code, "Service.ResourceNotFound");
        assert_eq!(fault.description, "Unknown service Nope");
        assert_eq!(fault.details[0], "UnknownServiceError: Unknown service Nope");
    }

    #[test]
    fn authentication_fault_is_fixed() {
        let fault = FaultTranslator::authentication_failed();
        assert_eq!(fault.code, "AuthenticationError");
        assert_eq!(fault.description, "Authentication failed");
    }

    #[test]
    fn concurrent_translations_do_not_interfere() {
        let translator = FaultTranslator::default();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    s.spawn(move || {
                        let err = RequestError::from(ServiceFailure::new(
                            format!("Kind{i}"),
                            format!("message {i}"),
                        ));
                        (i, translator.translate(&err))
                    })
                })
                .collect();
            for handle in handles {
                let (i, fault) = handle.join().unwrap();
                assert_eq!(fault.code, format!("Kind{i}"));
                assert_eq!(fault.description, format!("message {i}"));
            }
        });
    }
}
