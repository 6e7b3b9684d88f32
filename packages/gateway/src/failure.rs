//! Application failures raised by service code.

use std::any::Any;
use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt;

/// A failure returned by an invoked service.
///
/// Carries a kind name (the failure's "type", e.g. `ValueError`), an
/// optional stable code that takes precedence over the kind when the
/// failure is turned into a fault, a message, an optional cause and the
/// backtrace captured at construction (only populated when
/// `RUST_BACKTRACE` is enabled).
#[derive(Debug)]
pub struct ServiceFailure {
    kind: Cow<'static, str>,
    code: Option<Cow<'static, str>>,
    message: String,
    cause: Cause,
    backtrace: Backtrace,
}

#[derive(Debug)]
enum Cause {
    None,
    /// The failure was built from this error; its chain starts below it.
    Wrapped(anyhow::Error),
    /// An underlying error attached with `with_source`.
    Source(anyhow::Error),
}

impl ServiceFailure {
    /// Kind used for failures converted from `anyhow::Error`.
    pub const GENERIC_KIND: &'static str = "Error";
    /// Kind used for service code that panicked.
    pub const PANIC_KIND: &'static str = "PanicError";

    /// Creates a failure of the given kind.
    pub fn new(kind: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            code: None,
            message: message.into(),
            cause: Cause::None,
            backtrace: Backtrace::capture(),
        }
    }

    /// Builds a failure from a caught panic payload.
    ///
    /// `&str` and `String` payloads become the message; anything else gets
    /// a generic one.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "service panicked".to_string());
        Self::new(Self::PANIC_KIND, message)
    }

    /// Declares a stable fault code for this failure.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<Cow<'static, str>>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attaches the error that caused this failure.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.cause = Cause::Source(source.into());
        self
    }

    /// Kind name, e.g. `ValueError`.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Stable fault code, if declared.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Where the failure was created.
    #[must_use]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for ServiceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ServiceFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            Cause::None => None,
            Cause::Wrapped(err) => err.source(),
            Cause::Source(err) => Some(&**err),
        }
    }
}

impl From<anyhow::Error> for ServiceFailure {
    fn from(err: anyhow::Error) -> Self {
        Self {
            kind: Cow::Borrowed(Self::GENERIC_KIND),
            code: None,
            message: err.to_string(),
            cause: Cause::Wrapped(err),
            backtrace: Backtrace::capture(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn display_is_the_message() {
        let failure = ServiceFailure::new("ValueError", "bad input");
        assert_eq!(failure.to_string(), "bad input");
        assert_eq!(failure.kind(), "ValueError");
        assert!(failure.code().is_none());
    }

    #[test]
    fn with_code_overrides_nothing_else() {
        let failure = ServiceFailure::new("ValueError", "bad input").with_code("App.BadInput");
        assert_eq!(failure.code(), Some("App.BadInput"));
        assert_eq!(failure.kind(), "ValueError");
    }

    #[test]
    fn from_panic_reads_string_payloads() {
        let literal = std::panic::catch_unwind(|| panic!("index out of range")).unwrap_err();
        let failure = ServiceFailure::from_panic(literal.as_ref());
        assert_eq!(failure.kind(), "PanicError");
        assert_eq!(failure.message(), "index out of range");

        let formatted = std::panic::catch_unwind(|| panic!("bad slot {}", 7)).unwrap_err();
        assert_eq!(ServiceFailure::from_panic(formatted.as_ref()).message(), "bad slot 7");
    }

    #[test]
    fn from_panic_with_opaque_payload() {
        let payload = std::panic::catch_unwind(|| std::panic::panic_any(42_u8)).unwrap_err();
        assert_eq!(ServiceFailure::from_panic(payload.as_ref()).message(), "service panicked");
    }

    #[test]
    fn with_source_exposes_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
        let failure = ServiceFailure::new("IOError", "could not load").with_source(io);
        assert_eq!(failure.source().unwrap().to_string(), "missing file");
    }

    #[test]
    fn from_anyhow_skips_the_wrapped_error_itself() {
        let err = anyhow::anyhow!("root cause").context("top level");
        let failure = ServiceFailure::from(err);
        assert_eq!(failure.kind(), ServiceFailure::GENERIC_KIND);
        assert_eq!(failure.to_string(), "top level");
        assert_eq!(failure.source().unwrap().to_string(), "root cause");
    }

    #[test]
    fn from_anyhow_without_chain_has_no_source() {
        let failure = ServiceFailure::from(anyhow::anyhow!("flat"));
        assert!(failure.source().is_none());
    }
}
